//! Logging and observability
//!
//! Subscriber setup for the `fhirlink` binary plus a few event macros used
//! across the bulk workflow so that poll and download events carry the same
//! field names everywhere.
//!
//! # Example
//!
//! ```no_run
//! use fhirlink::logging::init_logging;
//! use fhirlink::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a failed HTTP response together with its body
///
/// # Example
///
/// ```no_run
/// use fhirlink::log_http_failure;
///
/// log_http_failure!("GET", "https://host/Patient/1", 404, "not found");
/// ```
#[macro_export]
macro_rules! log_http_failure {
    ($method:expr, $url:expr, $status:expr, $body:expr) => {
        tracing::error!(
            method = %$method,
            url = %$url,
            status = $status,
            body = %$body,
            "FHIR request failed"
        );
    };
}

/// Log the wait chosen between two status polls
///
/// # Example
///
/// ```no_run
/// use fhirlink::log_poll_wait;
/// use std::time::Duration;
///
/// log_poll_wait!("https://host/poll/1", Duration::from_secs(5));
/// ```
#[macro_export]
macro_rules! log_poll_wait {
    ($job:expr, $duration:expr) => {
        tracing::info!(
            job = %$job,
            wait_secs = $duration.as_secs(),
            "Sleeping before next status poll"
        );
    };
}

/// Log a completed output file download
///
/// # Example
///
/// ```no_run
/// use fhirlink::log_output_written;
///
/// log_output_written!("Patient", "https://host/files/p1.ndjson", "p1.ndjson");
/// ```
#[macro_export]
macro_rules! log_output_written {
    ($resource_type:expr, $url:expr, $id:expr) => {
        tracing::info!(
            resource_type = %$resource_type,
            url = %$url,
            written_to = %$id,
            "Bulk output file written"
        );
    };
}
