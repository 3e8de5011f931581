//! Search command implementation
//!
//! Runs a search and optionally follows `next` links for more pages.

use super::{connect, load_or_report, report_failure, EXIT_CONFIG, EXIT_OK};
use crate::domain::bundle;
use clap::Args;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Resource type, e.g. Patient
    pub resource_type: String,

    /// Search parameters as key=value pairs
    pub params: Vec<String>,

    /// Maximum number of result pages to fetch
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

/// Splits `key=value` arguments; the value may itself contain `=`
pub(crate) fn parse_params(params: &[String]) -> Result<Vec<(&str, &str)>, String> {
    params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| format!("Search parameter '{param}' is not key=value"))
        })
        .collect()
}

impl SearchArgs {
    /// Execute the search command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let query = match parse_params(&self.params) {
            Ok(q) => q,
            Err(e) => {
                println!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        tracing::info!(resource_type = %self.resource_type, params = ?query, "Searching");

        let Some(config) = load_or_report(config_path) else {
            return Ok(EXIT_CONFIG);
        };

        let client = match connect(&config) {
            Ok(c) => c,
            Err(e) => return Ok(report_failure("Client setup", &e)),
        };

        let mut page = match client.search(&self.resource_type, &query).await {
            Ok(p) => p,
            Err(e) => return Ok(report_failure("Search", &e)),
        };

        let mut fetched = 1;
        loop {
            for entry in bundle::entries(&page) {
                println!("{}", serde_json::to_string(&entry["resource"])?);
            }

            if fetched >= self.pages {
                break;
            }
            match client.search_next(&page).await {
                Ok(Some(next)) => {
                    page = next;
                    fetched += 1;
                }
                Ok(None) => break,
                Err(e) => return Ok(report_failure("Search paging", &e)),
            }
        }

        tracing::info!(pages = fetched, "Search complete");
        Ok(EXIT_OK)
    }
}
