//! Bulk match command implementation
//!
//! Reads patient search criteria from a JSON file (one object, or an array
//! of objects), runs `Patient/$bulk-match` and downloads the result files.

use super::{connect, load_or_report, report_failure, EXIT_CONFIG, EXIT_OK};
use crate::adapters::storage::DirectorySink;
use crate::core::bulk::{BulkCoordinator, BulkMatchRequest, PollPolicy, DEFAULT_MATCH_COUNT};
use crate::domain::{FhirLinkError, JobManifest, Result};
use clap::Args;
use serde_json::Value;
use std::path::Path;
use tokio::sync::watch;

/// Arguments for the bulk-match command
#[derive(Args, Debug)]
pub struct BulkMatchArgs {
    /// JSON file with one criteria object or an array of them
    pub criteria: String,

    /// Maximum matches returned per criterion
    #[arg(long, default_value_t = DEFAULT_MATCH_COUNT)]
    pub count: i64,

    /// Return only certain matches
    #[arg(long)]
    pub certain_only: bool,

    /// Directory for downloaded files (overrides bulk.output_dir)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Loads criteria from a JSON file
pub(crate) fn load_criteria(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        FhirLinkError::Validation(format!("Failed to read {}: {e}", path.display()))
    })?;

    match serde_json::from_str(&contents)? {
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(items),
        Value::Object(item) => Ok(vec![Value::Object(item)]),
        _ => Err(FhirLinkError::Validation(format!(
            "{} must contain a JSON object or an array of objects",
            path.display()
        ))),
    }
}

impl BulkMatchArgs {
    /// Execute the bulk-match command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let criteria = match load_criteria(&self.criteria) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Loading criteria", &e)),
        };

        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG);
        };

        let client = match connect(&config) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Client setup", &e)),
        };

        let request = BulkMatchRequest::new(criteria)
            .with_count(self.count)
            .with_certain_only(self.certain_only);
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.bulk.output_dir.clone());

        println!(
            "🚀 Starting bulk match of {} criteria against {}",
            request.criteria.len(),
            client.base_url()
        );
        println!();

        let coordinator = BulkCoordinator::new(&client, PollPolicy::from_config(&config.bulk))
            .with_shutdown(shutdown_signal);

        let result = match coordinator.bulk_match(&request).await {
            Ok(r) => r,
            Err(e) => return Ok(report_failure("Bulk match", &e)),
        };

        let manifest = match JobManifest::from_value(&result) {
            Ok(m) => m,
            Err(e) => return Ok(report_failure("Bulk match", &e)),
        };

        let files = match coordinator
            .materialize(&manifest, &DirectorySink::new(&output_dir))
            .await
        {
            Ok(f) => f,
            Err(e) => return Ok(report_failure("Download", &e)),
        };

        println!("📊 Bulk Match Summary:");
        println!("  Files: {}", files.len());
        for file in &files {
            println!("    - {output_dir}/{file}");
        }
        println!();
        println!("✅ Bulk match completed successfully!");

        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn criteria_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_criteria_array() {
        let file = criteria_file(r#"[{"birthDate": "1970-01-01"}, {"gender": "female"}]"#);
        let criteria = load_criteria(file.path()).unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[1]["gender"], "female");
    }

    #[test]
    fn test_load_criteria_single_object() {
        let file = criteria_file(r#"{"name": [{"family": "Smith"}]}"#);
        assert_eq!(load_criteria(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_load_criteria_rejects_scalars() {
        let file = criteria_file("[1, 2]");
        assert!(matches!(
            load_criteria(file.path()),
            Err(FhirLinkError::Validation(_))
        ));
    }

    #[test]
    fn test_load_criteria_missing_file() {
        assert!(load_criteria("/nonexistent/criteria.json").is_err());
    }
}
