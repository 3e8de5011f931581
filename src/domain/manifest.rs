//! Bulk job completion manifest
//!
//! The document a bulk status endpoint returns with `200 OK` once the job
//! has finished. Only `output` is required; the other members are kept when
//! the server sends them.

use super::{FhirLinkError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One downloadable file listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Resource type contained in the file
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Download URL of the file
    pub url: String,

    /// Number of resources in the file, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl OutputEntry {
    /// Creates a new output entry
    pub fn new(resource_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            url: url.into(),
            count: None,
        }
    }
}

/// Completion manifest of a bulk export or bulk match job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    /// Server time at which the job's data snapshot was taken
    #[serde(
        rename = "transactionTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_time: Option<String>,

    /// The kick-off request URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    /// Whether file downloads need the bearer token
    #[serde(
        rename = "requiresAccessToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_access_token: Option<bool>,

    /// Result files, in server order
    pub output: Vec<OutputEntry>,

    /// OperationOutcome files describing per-resource failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<OutputEntry>,
}

impl JobManifest {
    /// Creates a manifest from a list of output entries
    pub fn new(output: Vec<OutputEntry>) -> Self {
        Self {
            transaction_time: None,
            request: None,
            requires_access_token: None,
            output,
            error: Vec::new(),
        }
    }

    /// Interprets a decoded poll result as a manifest
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the document has no `output`
    /// array or an entry lacks `type` or `url`.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            FhirLinkError::Serialization(format!("Invalid bulk job manifest: {e}"))
        })
    }
}
