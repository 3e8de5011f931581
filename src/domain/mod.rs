//! Domain models and types for FhirLink.
//!
//! FHIR resources themselves are passed through as opaque
//! [`serde_json::Value`] documents. This module holds the few shapes the
//! client must understand to route calls:
//!
//! - **Identifiers** ([`ResourceType`], [`ResourceId`], [`JobHandle`])
//! - **Operation arguments** ([`Parameters`])
//! - **Search navigation** ([`bundle::next_link`])
//! - **Bulk results** ([`JobManifest`])
//! - **Errors** ([`FhirLinkError`], [`PollError`]) and the [`Result`] alias
//!
//! # Example
//!
//! ```rust
//! use fhirlink::domain::{ParameterValue, Parameters};
//!
//! # fn example() -> fhirlink::domain::Result<()> {
//! let body = Parameters::new()
//!     .with("count", ParameterValue::Integer(3))
//!     .into_value()?;
//! assert_eq!(body["resourceType"], "Parameters");
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod errors;
pub mod ids;
pub mod manifest;
pub mod parameters;
pub mod result;

pub use errors::{FhirLinkError, PollError};
pub use ids::{JobHandle, ResourceId, ResourceType};
pub use manifest::{JobManifest, OutputEntry};
pub use parameters::{Parameter, ParameterValue, Parameters};
pub use result::Result;
