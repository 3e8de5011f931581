//! Domain error types
//!
//! This module defines the error hierarchy for FhirLink. Errors carry plain
//! data (status codes, response bodies, messages) and never expose the HTTP
//! client's own error types.

use thiserror::Error;

/// Main FhirLink error type
///
/// Every fallible operation in the crate returns this type. Callers of
/// resource operations see the first failure unchanged; bulk operations
/// may additionally fail with [`FhirLinkError::Poll`] or
/// [`FhirLinkError::Cancelled`].
#[derive(Debug, Error)]
pub enum FhirLinkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token exchange or credential errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Non-2xx response from a resource or operation call
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    /// Bulk job status polling failed
    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    /// Network-level failure below the HTTP layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller aborted the operation or its deadline passed
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Invalid input supplied by the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Terminal failures of the bulk job poller
#[derive(Debug, Error)]
pub enum PollError {
    /// The status endpoint kept returning errors past the tolerated count
    #[error("status endpoint failed {attempts} consecutive times, last status {status}: {body}")]
    RetriesExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    /// The status endpoint answered with a status the protocol does not allow
    #[error("Invalid poll response: status {status}")]
    InvalidResponse { status: u16 },
}

impl FhirLinkError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FhirLinkError::Http { status, .. } => Some(*status),
            FhirLinkError::Poll(PollError::RetriesExhausted { status, .. }) => Some(*status),
            FhirLinkError::Poll(PollError::InvalidResponse { status }) => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FhirLinkError::Cancelled(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for FhirLinkError {
    fn from(err: std::io::Error) -> Self {
        FhirLinkError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FhirLinkError {
    fn from(err: serde_json::Error) -> Self {
        FhirLinkError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FhirLinkError {
    fn from(err: toml::de::Error) -> Self {
        FhirLinkError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = FhirLinkError::Http {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 404 - not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_poll_error_conversion() {
        let poll_err = PollError::InvalidResponse { status: 204 };
        let err: FhirLinkError = poll_err.into();
        assert!(matches!(err, FhirLinkError::Poll(_)));
        assert_eq!(err.status(), Some(204));
        assert!(err.to_string().contains("Invalid poll response"));
    }

    #[test]
    fn test_retries_exhausted_carries_last_status() {
        let err: FhirLinkError = PollError::RetriesExhausted {
            attempts: 4,
            status: 503,
            body: "busy".to_string(),
        }
        .into();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_is_distinct() {
        let err = FhirLinkError::Cancelled("shutdown requested".to_string());
        assert!(err.is_cancelled());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: FhirLinkError = io_err.into();
        assert!(matches!(err, FhirLinkError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: FhirLinkError = json_err.into();
        assert!(matches!(err, FhirLinkError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: FhirLinkError = toml_err.into();
        assert!(matches!(err, FhirLinkError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
