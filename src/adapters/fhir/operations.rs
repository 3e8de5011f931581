//! Resource operations
//!
//! CRUD, search and named operations (`$match`, `$validate`,
//! `$everything`, `$member-add`, `$member-remove`) on top of
//! [`FhirClient::execute`]. URLs follow `{base}/{type}[/{id}][/{operation}]`.

use super::auth::fetch_smart_configuration;
use super::client::{owned_query, FhirClient};
use crate::domain::bundle;
use crate::domain::parameters::patient_criteria;
use crate::domain::{FhirLinkError, ParameterValue, Parameters, ResourceId, ResourceType, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::Instrument;

/// Page size used by `$everything` when the caller does not pick one
pub const DEFAULT_EVERYTHING_COUNT: u32 = 100;

/// Group membership operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOperation {
    MemberAdd,
    MemberRemove,
}

impl GroupOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperation::MemberAdd => "$member-add",
            GroupOperation::MemberRemove => "$member-remove",
        }
    }
}

impl std::fmt::Display for GroupOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn resource_type(name: &str) -> Result<ResourceType> {
    ResourceType::new(name).map_err(FhirLinkError::Validation)
}

fn resource_id(id: &str) -> Result<ResourceId> {
    ResourceId::new(id).map_err(FhirLinkError::Validation)
}

impl FhirClient {
    /// GET `{base}/metadata`, the server's CapabilityStatement
    pub async fn metadata(&self) -> Result<Value> {
        let url = self.url(&["metadata"]);
        self.execute(Method::GET, &url, &[], None).await
    }

    /// GET `{base}/.well-known/smart-configuration`
    pub async fn smart_configuration(&self) -> Result<Value> {
        fetch_smart_configuration(self.http(), self.base_url())
            .instrument(self.span().clone())
            .await
    }

    /// Reads one resource by type and id
    pub async fn read(&self, resource_type_name: &str, id: &str) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let id = resource_id(id)?;
        let url = self.url(&[rt.as_str(), id.as_str()]);
        self.execute(Method::GET, &url, &[], None).await
    }

    /// Creates a resource in the type's collection
    ///
    /// Returns whatever the server sends back, typically the stored
    /// resource with its assigned id.
    pub async fn create(&self, resource_type_name: &str, resource: &Value) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let url = self.url(&[rt.as_str()]);
        self.execute(Method::POST, &url, &[], Some(resource)).await
    }

    /// Replaces a resource by type and id
    pub async fn update(&self, resource_type_name: &str, id: &str, resource: &Value) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let id = resource_id(id)?;
        let url = self.url(&[rt.as_str(), id.as_str()]);
        self.execute(Method::PUT, &url, &[], Some(resource)).await
    }

    /// Deletes a resource; an empty response body yields `{}`
    pub async fn delete(&self, resource_type_name: &str, id: &str) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let id = resource_id(id)?;
        let url = self.url(&[rt.as_str(), id.as_str()]);
        self.execute(Method::DELETE, &url, &[], None).await
    }

    /// Searches a resource type with the given query parameters
    pub async fn search(&self, resource_type_name: &str, query: &[(&str, &str)]) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let url = self.url(&[rt.as_str()]);
        self.execute(Method::GET, &url, &owned_query(query), None).await
    }

    /// GET `{base}/{type}/$match` with query parameters
    pub async fn search_match(
        &self,
        resource_type_name: &str,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let url = self.url(&[rt.as_str(), "$match"]);
        self.execute(Method::GET, &url, &owned_query(query), None).await
    }

    /// Follows the `next` link of a search Bundle
    ///
    /// Returns `None` when the Bundle has no `next` link or more than one.
    pub async fn search_next(&self, search_results: &Value) -> Result<Option<Value>> {
        match bundle::next_link(search_results) {
            Some(next) => {
                let next = next.to_string();
                self.execute(Method::GET, &next, &[], None).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Synchronous `Patient/$match` with one search criterion
    pub async fn patient_match(
        &self,
        criteria: &Value,
        count: i64,
        certain_only: bool,
    ) -> Result<Value> {
        let body = Parameters::new()
            .with("resource", patient_criteria(criteria))
            .with("count", ParameterValue::Integer(count))
            .with("onlyCertainMatches", ParameterValue::Boolean(certain_only))
            .into_value()?;

        let url = self.url(&["Patient", "$match"]);
        self.execute(Method::POST, &url, &[], Some(&body)).await
    }

    /// Asks the server to validate a resource
    ///
    /// Empty `mode` and `profile` values are left out.
    pub async fn validate(
        &self,
        resource_type_name: &str,
        resource: &Value,
        mode: Option<&str>,
        profile: Option<&str>,
    ) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let body = Parameters::new()
            .with("resource", ParameterValue::Resource(resource.clone()))
            .with_code_opt("mode", mode)
            .with_code_opt("profile", profile)
            .into_value()?;

        let url = self.url(&[rt.as_str(), "$validate"]);
        self.execute(Method::POST, &url, &[], Some(&body)).await
    }

    /// `$everything` on one resource with a page size
    pub async fn everything(
        &self,
        resource_type_name: &str,
        id: &str,
        count: Option<u32>,
    ) -> Result<Value> {
        let rt = resource_type(resource_type_name)?;
        let id = resource_id(id)?;
        let url = self.url(&[rt.as_str(), id.as_str(), "$everything"]);
        let count = count.unwrap_or(DEFAULT_EVERYTHING_COUNT).to_string();
        let query = vec![("_count".to_string(), count)];
        self.execute(Method::GET, &url, &query, None).await
    }

    /// Adds or removes a patient from a Group
    ///
    /// The body is a Parameters resource with a single `patientReference`
    /// pointing at `patient_id`.
    pub async fn mutate_group(
        &self,
        group_id: &str,
        patient_id: &str,
        operation: GroupOperation,
    ) -> Result<Value> {
        let group_id = resource_id(group_id)?;
        let body = group_membership_body(patient_id)?;

        tracing::debug!(group = %group_id, operation = %operation, "Mutating group membership");

        let url = self.url(&["Group", group_id.as_str(), operation.as_str()]);
        self.execute(Method::POST, &url, &[], Some(&body)).await
    }

    pub async fn member_add(&self, group_id: &str, patient_id: &str) -> Result<Value> {
        self.mutate_group(group_id, patient_id, GroupOperation::MemberAdd)
            .await
    }

    pub async fn member_remove(&self, group_id: &str, patient_id: &str) -> Result<Value> {
        self.mutate_group(group_id, patient_id, GroupOperation::MemberRemove)
            .await
    }
}

fn group_membership_body(patient_id: &str) -> Result<Value> {
    Parameters::new()
        .with(
            "patientReference",
            ParameterValue::Reference {
                reference: patient_id.to_string(),
                target_type: "Patient".to_string(),
            },
        )
        .into_value()
}
