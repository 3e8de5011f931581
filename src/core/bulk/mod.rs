//! FHIR Bulk Data workflow
//!
//! - [`launcher`] - export and bulk-match kick-off with `Prefer: respond-async`
//! - [`poller`] - job status polling with `Retry-After` and bounded error tolerance
//! - [`materializer`] - streaming output files into an [`crate::adapters::storage::OutputSink`]
//! - [`coordinator`] - the [`BulkCoordinator`] the three operate on, plus cancellation

pub mod coordinator;
pub mod launcher;
pub mod materializer;
pub mod poller;
pub mod retry_after;

pub use coordinator::BulkCoordinator;
pub use launcher::{
    BulkMatchRequest, ExportLevel, ExportRequest, Kickoff, DEFAULT_EXPORT_TYPES,
    DEFAULT_MATCH_COUNT,
};
pub use materializer::output_file_name;
pub use poller::{PollPolicy, Sleeper, TokioSleeper, DEFAULT_MAX_POLL_ERRORS, DEFAULT_POLL_INTERVAL};
pub use retry_after::retry_after_seconds;
