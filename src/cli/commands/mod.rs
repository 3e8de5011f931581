//! CLI command implementations
//!
//! This module contains all CLI command implementations plus the helpers
//! they share: config loading, client construction and exit codes.

pub mod bulk_match;
pub mod export;
pub mod init;
pub mod metadata;
pub mod read;
pub mod search;
pub mod validate;

use crate::adapters::fhir::{FhirClient, JwtCredentials};
use crate::config::{load_config, FhirLinkConfig};
use crate::domain::{FhirLinkError, Result};

/// Command finished normally
pub const EXIT_OK: i32 = 0;
/// The server or network failed the request
pub const EXIT_REMOTE_FAILURE: i32 = 1;
/// Configuration or argument error
pub const EXIT_CONFIG: i32 = 2;
/// Interrupted by a signal (standard Unix convention)
pub const EXIT_CANCELLED: i32 = 130;

/// Exit code for a failed command
pub fn exit_code_for(err: &FhirLinkError) -> i32 {
    match err {
        FhirLinkError::Configuration(_) | FhirLinkError::Validation(_) => EXIT_CONFIG,
        FhirLinkError::Cancelled(_) => EXIT_CANCELLED,
        _ => EXIT_REMOTE_FAILURE,
    }
}

/// Loads the configuration, printing the failure the way every command does
pub(crate) fn load_or_report(config_path: &str) -> Option<FhirLinkConfig> {
    match load_config(config_path) {
        Ok(config) => Some(config),
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            None
        }
    }
}

/// Builds a client for the configured server, with SMART backend
/// authentication when an `[oauth]` section is present
pub(crate) fn connect(config: &FhirLinkConfig) -> Result<FhirClient> {
    let client = FhirClient::from_config(&config.server)?;
    match &config.oauth {
        Some(oauth) => {
            tracing::info!(client_id = %oauth.client_id, "Using SMART backend services authentication");
            Ok(client.with_jwt_bearer(JwtCredentials::from_config(oauth)?))
        }
        None => Ok(client),
    }
}

/// Reports a failed command and returns its exit code
pub(crate) fn report_failure(action: &str, err: &FhirLinkError) -> i32 {
    tracing::error!(error = %err, "{action} failed");
    if err.is_cancelled() {
        println!("⚠️  {action} cancelled: {err}");
    } else {
        println!("❌ {action} failed");
        println!("   Error: {err}");
    }
    exit_code_for(err)
}
