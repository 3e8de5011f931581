//! Read command implementation

use super::{connect, load_or_report, report_failure, EXIT_CONFIG, EXIT_OK};
use clap::Args;

/// Arguments for the read command
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Resource type, e.g. Patient
    pub resource_type: String,

    /// Logical id of the resource
    pub id: String,
}

impl ReadArgs {
    /// Execute the read command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(resource_type = %self.resource_type, id = %self.id, "Reading resource");

        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG);
        };

        let client = match connect(&config) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Client setup", &e)),
        };

        match client.read(&self.resource_type, &self.id).await {
            Ok(resource) => {
                println!("{}", serde_json::to_string_pretty(&resource)?);
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report_failure("Read", &e)),
        }
    }
}
