//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that end up as URL path segments,
//! plus the bulk job handle returned by a kick-off request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FHIR resource type name, e.g. `Patient` or `Group`
///
/// # Examples
///
/// ```
/// use fhirlink::domain::ids::ResourceType;
/// use std::str::FromStr;
///
/// let resource_type = ResourceType::from_str("Patient").unwrap();
/// assert_eq!(resource_type.as_str(), "Patient");
/// assert!(ResourceType::from_str("Patient/123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a new ResourceType
    ///
    /// Resource type names are ASCII alphanumeric and start with an
    /// uppercase letter.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let mut chars = name.chars();
        match chars.next() {
            None => return Err("Resource type cannot be empty".to_string()),
            Some(c) if !c.is_ascii_uppercase() => {
                return Err(format!(
                    "Resource type must start with an uppercase letter, got: {name}"
                ))
            }
            _ => {}
        }
        if !chars.all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "Resource type must be alphanumeric, got: {name}"
            ));
        }
        Ok(Self(name))
    }

    /// Returns the resource type as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Logical id of a resource on the server
///
/// FHIR ids are limited to `[A-Za-z0-9\-\.]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a new ResourceId
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("Resource id cannot be empty".to_string());
        }
        if id.len() > 64 {
            return Err(format!("Resource id longer than 64 characters: {id}"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("Resource id contains invalid characters: {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Status URL of an asynchronous bulk job
///
/// Taken from the `Content-Location` header of a `202 Accepted` kick-off
/// response and consumed by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    /// Creates a new JobHandle from an absolute status URL
    pub fn new(url: impl Into<String>) -> Result<Self, String> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err("Job status URL cannot be empty".to_string());
        }
        url::Url::parse(trimmed).map_err(|e| format!("Invalid job status URL {trimmed}: {e}"))?;
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the status URL
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobHandle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
