//! Core business logic for FhirLink.
//!
//! # Modules
//!
//! - [`bulk`] - Bulk Data kick-off, status polling and output download
//!
//! # Bulk Workflow
//!
//! 1. **Kick-off**: `GET $export` or `POST Patient/$bulk-match` with
//!    `Prefer: respond-async`
//! 2. **Accept**: `202 Accepted` with the job status URL in `Content-Location`
//! 3. **Poll**: GET the status URL, honoring `Retry-After`, until `200 OK`
//! 4. **Materialize**: stream every file listed in the manifest to a sink
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirlink::adapters::fhir::{ClientConfig, FhirClient};
//! use fhirlink::core::bulk::{BulkCoordinator, BulkMatchRequest, PollPolicy};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> fhirlink::domain::Result<()> {
//! let client = FhirClient::new(ClientConfig::new("https://fhir.example.com/r4"))?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let policy = PollPolicy::default().with_deadline(Duration::from_secs(3600));
//! let coordinator = BulkCoordinator::new(&client, policy).with_shutdown(shutdown_rx);
//!
//! let request = BulkMatchRequest::new(vec![json!({"birthDate": "1970-01-01"})]);
//! let manifest = coordinator.bulk_match(&request).await?;
//! println!("{}", manifest["output"]);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
