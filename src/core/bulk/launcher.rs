//! Bulk job kick-off
//!
//! Export and bulk-match requests are sent with `Prefer: respond-async`.
//! A `202 Accepted` answer carries the job status URL in
//! `Content-Location` and is handed to the poller; any other success status
//! is already the final result.

use super::coordinator::BulkCoordinator;
use crate::adapters::fhir::client::decode_json;
use crate::domain::parameters::patient_criteria;
use crate::domain::{
    FhirLinkError, JobHandle, ParameterValue, Parameters, PollError, ResourceId, Result,
};
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_LOCATION;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::Instrument;

/// Resource types exported when the caller names none
pub const DEFAULT_EXPORT_TYPES: &[&str] = &["Patient"];

/// Match count used by bulk match when the caller does not pick one
pub const DEFAULT_MATCH_COUNT: i64 = 3;

/// Scope of a bulk export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportLevel {
    /// `$export` on the whole server
    System,
    /// `Patient/$export`
    Patient,
    /// `Group/{id}/$export`
    Group(String),
}

impl ExportLevel {
    fn path(&self) -> Result<Vec<String>> {
        Ok(match self {
            ExportLevel::System => vec!["$export".to_string()],
            ExportLevel::Patient => vec!["Patient".to_string(), "$export".to_string()],
            ExportLevel::Group(id) => {
                let id = ResourceId::new(id.as_str()).map_err(FhirLinkError::Validation)?;
                vec!["Group".to_string(), id.to_string(), "$export".to_string()]
            }
        })
    }
}

impl std::fmt::Display for ExportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportLevel::System => write!(f, "system"),
            ExportLevel::Patient => write!(f, "patient"),
            ExportLevel::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// Parameters of a bulk export kick-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub level: ExportLevel,
    /// Only resources changed after this instant (`_since`)
    pub since: Option<DateTime<Utc>>,
    /// Resource types to include (`_type`)
    pub types: Vec<String>,
}

impl ExportRequest {
    pub fn new(level: ExportLevel) -> Self {
        Self {
            level,
            since: None,
            types: DEFAULT_EXPORT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn patient() -> Self {
        Self::new(ExportLevel::Patient)
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Self::new(ExportLevel::Group(group_id.into()))
    }

    pub fn system() -> Self {
        Self::new(ExportLevel::System)
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Replaces the type filter; an empty list keeps the default
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        if !types.is_empty() {
            self.types = types;
        }
        self
    }

    /// `_type` and, when set, `_since` in ISO-8601 with a `+00:00` offset
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut query = vec![("_type".to_string(), self.types.join(","))];
        if let Some(since) = self.since {
            query.push(("_since".to_string(), since.to_rfc3339()));
        }
        query
    }
}

/// Parameters of a bulk patient match kick-off
#[derive(Debug, Clone, PartialEq)]
pub struct BulkMatchRequest {
    /// Patient search criteria, one `resource` parameter each
    pub criteria: Vec<Value>,
    pub count: i64,
    pub certain_only: bool,
}

impl BulkMatchRequest {
    pub fn new(criteria: Vec<Value>) -> Self {
        Self {
            criteria,
            count: DEFAULT_MATCH_COUNT,
            certain_only: false,
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn with_certain_only(mut self, certain_only: bool) -> Self {
        self.certain_only = certain_only;
        self
    }

    /// Builds the Parameters body
    pub fn body(&self) -> Result<Value> {
        let mut parameters = Parameters::new();
        for criterion in &self.criteria {
            parameters = parameters.with("resource", patient_criteria(criterion));
        }
        parameters
            .with("count", ParameterValue::Integer(self.count))
            .with("onlyCertainMatches", ParameterValue::Boolean(self.certain_only))
            .into_value()
    }
}

/// What the server did with a kick-off request
#[derive(Debug, Clone, PartialEq)]
pub enum Kickoff {
    /// Job accepted; poll this handle
    Accepted(JobHandle),
    /// Server answered synchronously with the final result
    Completed(Value),
}

impl BulkCoordinator<'_> {
    /// Sends an export kick-off without polling
    pub async fn start_export(&self, request: &ExportRequest) -> Result<Kickoff> {
        let segments = request.level.path()?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let url = self.client.url(&segments);

        tracing::info!(
            level = %request.level,
            types = %request.types.join(","),
            since = ?request.since,
            "Starting bulk export"
        );

        self.kick_off(Method::GET, &url, &request.query_params(), None)
            .instrument(self.client.span().clone())
            .await
    }

    /// Sends a `Patient/$bulk-match` kick-off without polling
    pub async fn start_bulk_match(&self, request: &BulkMatchRequest) -> Result<Kickoff> {
        if request.criteria.is_empty() {
            return Err(FhirLinkError::Validation(
                "bulk match needs at least one search criterion".to_string(),
            ));
        }

        let body = request.body()?;
        let url = self.client.url(&["Patient", "$bulk-match"]);

        tracing::info!(
            criteria = request.criteria.len(),
            count = request.count,
            certain_only = request.certain_only,
            "Starting bulk match"
        );

        self.kick_off(Method::POST, &url, &[], Some(&body))
            .instrument(self.client.span().clone())
            .await
    }

    /// Exports and waits for the job; returns the manifest document
    pub async fn export(&self, request: &ExportRequest) -> Result<Value> {
        match self.start_export(request).await? {
            Kickoff::Accepted(handle) => self.poll(&handle).await,
            Kickoff::Completed(result) => Ok(result),
        }
    }

    /// Runs a bulk match and waits for the job; returns the manifest document
    pub async fn bulk_match(&self, request: &BulkMatchRequest) -> Result<Value> {
        match self.start_bulk_match(request).await? {
            Kickoff::Accepted(handle) => self.poll(&handle).await,
            Kickoff::Completed(result) => Ok(result),
        }
    }

    async fn kick_off(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Kickoff> {
        let mut guard = self.cancel_guard();
        guard.check()?;

        let response = guard
            .run(
                self.client.execute_async(method, url, query, body),
            )
            .await??;

        if response.status() == StatusCode::ACCEPTED {
            let handle = self.job_handle(&response)?;
            tracing::info!(job = %handle, "Bulk job accepted");
            Ok(Kickoff::Accepted(handle))
        } else {
            tracing::info!(
                status = response.status().as_u16(),
                "Kick-off answered synchronously"
            );
            Ok(Kickoff::Completed(decode_json(response).await?))
        }
    }

    /// Reads `Content-Location`, resolving a relative location against the base URL
    fn job_handle(&self, response: &Response) -> Result<JobHandle> {
        let location = response
            .headers()
            .get(CONTENT_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                tracing::error!("202 Accepted without Content-Location");
                FhirLinkError::Poll(PollError::InvalidResponse {
                    status: StatusCode::ACCEPTED.as_u16(),
                })
            })?;

        let resolved = self.resolve_url(location)?;
        JobHandle::new(resolved.as_str()).map_err(FhirLinkError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_export_defaults_to_patient_type() {
        let request = ExportRequest::patient();
        assert_eq!(request.types, vec!["Patient".to_string()]);
        assert_eq!(
            request.query_params(),
            vec![("_type".to_string(), "Patient".to_string())]
        );
    }

    #[test]
    fn test_export_query_with_since_and_types() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let request = ExportRequest::group("g1")
            .with_since(since)
            .with_types(["Patient", "Observation"]);

        assert_eq!(
            request.query_params(),
            vec![
                ("_type".to_string(), "Patient,Observation".to_string()),
                ("_since".to_string(), "2024-01-01T00:00:00+00:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_type_list_keeps_default() {
        let request = ExportRequest::system().with_types(Vec::<String>::new());
        assert_eq!(request.types, vec!["Patient".to_string()]);
    }

    #[test]
    fn test_export_level_paths() {
        assert_eq!(ExportLevel::System.path().unwrap(), vec!["$export"]);
        assert_eq!(ExportLevel::Patient.path().unwrap(), vec!["Patient", "$export"]);
        assert_eq!(
            ExportLevel::Group("g-1".to_string()).path().unwrap(),
            vec!["Group", "g-1", "$export"]
        );
        assert!(ExportLevel::Group("a/b".to_string()).path().is_err());
    }

    #[test]
    fn test_bulk_match_body() {
        let request = BulkMatchRequest::new(vec![
            json!({"name": [{"family": "Smith"}]}),
            json!({"birthDate": "1970-01-01"}),
        ])
        .with_count(5)
        .with_certain_only(true);

        let body = request.body().unwrap();
        let params = body["parameter"].as_array().unwrap();

        assert_eq!(params.len(), 4);
        assert_eq!(params[0]["name"], "resource");
        assert_eq!(params[0]["resource"]["resourceType"], "Patient");
        assert_eq!(params[0]["resource"]["name"][0]["family"], "Smith");
        assert_eq!(params[1]["resource"]["birthDate"], "1970-01-01");
        assert_eq!(params[2], json!({"name": "count", "valueInteger": 5}));
        assert_eq!(
            params[3],
            json!({"name": "onlyCertainMatches", "valueBoolean": true})
        );
    }
}
