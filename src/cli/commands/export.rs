//! Export command implementation
//!
//! This module implements the `export` command: a bulk data export at
//! patient, group or system level, followed by download of every output
//! file into a local directory.

use super::{connect, load_or_report, report_failure, EXIT_CONFIG, EXIT_OK};
use crate::adapters::storage::DirectorySink;
use crate::core::bulk::{BulkCoordinator, ExportLevel, ExportRequest, PollPolicy};
use crate::domain::JobManifest;
use chrono::{DateTime, Utc};
use clap::Args;
use std::time::Instant;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export the members of this Group instead of all patients
    #[arg(long, conflicts_with = "system")]
    pub group: Option<String>,

    /// System-level export of the whole server
    #[arg(long)]
    pub system: bool,

    /// Only resources updated after this instant (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Resource types to export (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Directory for downloaded files (overrides bulk.output_dir)
    #[arg(short, long)]
    pub output: Option<String>,
}

impl ExportArgs {
    /// Export scope selected by the flags
    pub fn level(&self) -> ExportLevel {
        match (&self.group, self.system) {
            (Some(group), _) => ExportLevel::Group(group.clone()),
            (None, true) => ExportLevel::System,
            (None, false) => ExportLevel::Patient,
        }
    }

    /// Kick-off request built from the flags
    pub fn request(&self) -> ExportRequest {
        let mut request = ExportRequest::new(self.level()).with_types(
            self.types
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty()),
        );
        if let Some(since) = self.since {
            request = request.with_since(since);
        }
        request
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG);
        };

        let client = match connect(&config) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Client setup", &e)),
        };

        let request = self.request();
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.bulk.output_dir.clone());

        println!("🚀 Starting {} export", request.level);
        println!("  Server: {}", client.base_url());
        println!("  Types: {}", request.types.join(","));
        if let Some(since) = request.since {
            println!("  Since: {}", since.to_rfc3339());
        }
        println!("  Output: {output_dir}");
        println!();

        let start = Instant::now();
        let coordinator = BulkCoordinator::new(&client, PollPolicy::from_config(&config.bulk))
            .with_shutdown(shutdown_signal);

        let result = match coordinator.export(&request).await {
            Ok(r) => r,
            Err(e) => return Ok(report_failure("Export", &e)),
        };

        let manifest = match JobManifest::from_value(&result) {
            Ok(m) => m,
            Err(e) => return Ok(report_failure("Export", &e)),
        };

        let sink = DirectorySink::new(&output_dir);
        let files = match coordinator.materialize(&manifest, &sink).await {
            Ok(f) => f,
            Err(e) => return Ok(report_failure("Download", &e)),
        };

        println!("📊 Export Summary:");
        println!("  Files: {}", files.len());
        for file in &files {
            println!("    - {file}");
        }
        if !manifest.error.is_empty() {
            println!("  ⚠️  Server reported {} error file(s)", manifest.error.len());
        }
        println!("  Duration: {:.2}s", start.elapsed().as_secs_f64());
        println!();
        println!("✅ Export completed successfully!");

        Ok(EXIT_OK)
    }
}
