//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the FhirLink configuration file.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::adapters::fhir::JwtCredentials;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // Key material is only read here, not during load
        if let Some(ref oauth) = config.oauth {
            if let Err(e) = JwtCredentials::from_config(oauth) {
                println!("❌ OAuth signing key is unusable");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  FHIR Server: {}", config.server.base_url);
        println!("  Auth Type: {}", config.server.auth_type);
        println!(
            "  Static Token: {}",
            if config.server.token.is_some() { "set" } else { "none" }
        );
        println!("  TLS Verify: {}", config.server.tls_verify);
        println!("  Extra Headers: {}", config.server.extra_headers.len());
        match config.oauth {
            Some(ref oauth) => {
                println!("  OAuth Client: {}", oauth.client_id);
                println!("  OAuth Key Id: {}", oauth.key_id);
                println!("  OAuth Algorithm: {}", oauth.algorithm);
            }
            None => println!("  OAuth: disabled"),
        }
        println!("  Polling Interval: {}s", config.bulk.default_polling_seconds);
        println!("  Max Poll Errors: {}", config.bulk.max_poll_errors);
        match config.bulk.deadline_seconds {
            Some(deadline) => println!("  Job Deadline: {deadline}s"),
            None => println!("  Job Deadline: none"),
        }
        println!("  Output Directory: {}", config.bulk.output_dir);
        println!();

        Ok(EXIT_OK)
    }
}
