//! Metadata command implementation
//!
//! Prints the server's CapabilityStatement.

use super::{connect, load_or_report, report_failure, EXIT_CONFIG, EXIT_OK};
use clap::Args;

/// Arguments for the metadata command
#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Print only the FHIR version and software name
    #[arg(long)]
    pub summary: bool,
}

impl MetadataArgs {
    /// Execute the metadata command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG);
        };

        let client = match connect(&config) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Client setup", &e)),
        };

        let statement = match client.metadata().await {
            Ok(s) => s,
            Err(e) => return Ok(report_failure("Metadata request", &e)),
        };

        if self.summary {
            println!("Server: {}", client.base_url());
            println!(
                "  FHIR Version: {}",
                statement["fhirVersion"].as_str().unwrap_or("unknown")
            );
            println!(
                "  Software: {} {}",
                statement["software"]["name"].as_str().unwrap_or("unknown"),
                statement["software"]["version"].as_str().unwrap_or("")
            );
        } else {
            println!("{}", serde_json::to_string_pretty(&statement)?);
        }

        Ok(EXIT_OK)
    }
}
