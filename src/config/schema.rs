//! Configuration schema types
//!
//! This module defines the TOML configuration structure for FhirLink.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main FhirLink configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirLinkConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// FHIR server connection
    pub server: ServerConfig,

    /// SMART backend services credentials (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,

    /// Bulk data polling and output settings
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FhirLinkConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.server.validate(&self.environment)?;
        if let Some(ref oauth) = self.oauth {
            oauth.validate()?;
        }
        self.bulk.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// FHIR server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base endpoint URL, e.g. `https://fhir.example.com/r4`
    pub base_url: String,

    /// Authorization scheme label placed before the token
    #[serde(default = "default_auth_type")]
    pub auth_type: String,

    /// Static bearer token (optional)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub token: Option<SecretString>,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: disabling verification exposes the client to
    /// man-in-the-middle attacks. Rejected in production environments.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Request timeout in seconds; bounds file downloads too
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Headers added to every request
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl ServerConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("server.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("server.base_url must start with http:// or https://".to_string());
        }

        if self.auth_type.trim().is_empty() {
            return Err("server.auth_type cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("server.timeout_seconds must be greater than 0".to_string());
        }

        for name in self.extra_headers.keys() {
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(format!("server.extra_headers has invalid header name '{name}'"));
            }
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments. \
                Set 'tls_verify = true', or use environment = \"development\" or \"staging\" \
                for testing."
                    .to_string(),
            );
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/fhir".to_string(),
            auth_type: default_auth_type(),
            token: None,
            tls_verify: true,
            timeout_seconds: default_timeout_seconds(),
            extra_headers: BTreeMap::new(),
        }
    }
}

/// SMART backend services (client credentials with JWT assertion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Registered client id, used as `iss` and `sub`
    pub client_id: String,

    /// Key identifier placed in the assertion header (`kid`)
    pub key_id: String,

    /// Inline PEM private key (or HMAC secret for HS* algorithms)
    #[serde(default)]
    pub private_key: Option<SecretString>,

    /// Path to a PEM private key file
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// JWK set URL advertised in the assertion (`jku`)
    #[serde(default)]
    pub jku: Option<String>,

    /// Signing algorithm
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl OAuthConfig {
    fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("oauth.client_id cannot be empty".to_string());
        }

        if self.key_id.trim().is_empty() {
            return Err("oauth.key_id cannot be empty".to_string());
        }

        match (&self.private_key, &self.private_key_path) {
            (Some(_), Some(_)) => {
                return Err(
                    "oauth.private_key and oauth.private_key_path are mutually exclusive"
                        .to_string(),
                )
            }
            (None, None) => {
                return Err(
                    "oauth requires either private_key or private_key_path".to_string()
                )
            }
            _ => {}
        }

        self.algorithm
            .parse::<jsonwebtoken::Algorithm>()
            .map_err(|_| format!("Invalid oauth.algorithm '{}'", self.algorithm))?;

        Ok(())
    }
}

/// Bulk data workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Default wait between status polls, and the ceiling for `Retry-After`
    #[serde(default = "default_polling_seconds")]
    pub default_polling_seconds: u64,

    /// Consecutive status-endpoint errors tolerated before giving up
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,

    /// Overall time allowed for a bulk job, from kick-off through download (unbounded when absent)
    #[serde(default)]
    pub deadline_seconds: Option<u64>,

    /// Directory that receives downloaded output files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl BulkConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_polling_seconds == 0 {
            return Err("bulk.default_polling_seconds must be greater than 0".to_string());
        }

        if self.max_poll_errors > 100 {
            return Err(format!(
                "bulk.max_poll_errors must be at most 100, got {}",
                self.max_poll_errors
            ));
        }

        if self.deadline_seconds == Some(0) {
            return Err("bulk.deadline_seconds must be greater than 0 when set".to_string());
        }

        if self.output_dir.trim().is_empty() {
            return Err("bulk.output_dir cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            default_polling_seconds: default_polling_seconds(),
            max_poll_errors: default_max_poll_errors(),
            deadline_seconds: None,
            output_dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err(
                "logging.local_path cannot be empty when local logging is enabled".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auth_type() -> String {
    "Bearer".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_algorithm() -> String {
    "RS384".to_string()
}

fn default_polling_seconds() -> u64 {
    120
}

fn default_max_poll_errors() -> u32 {
    3
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
