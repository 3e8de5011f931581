//! FHIR REST client
//!
//! [`FhirClient`] owns the HTTP connection pool, the bearer token and the
//! static headers sent with every request. Resource operations live in
//! [`super::operations`]; the bulk workflow drives the crate-internal
//! [`FhirClient::send`] directly so it can inspect raw poll responses.

use super::auth::{JwtBearerRefresher, JwtCredentials, NoopRefresher, TokenRefresher, TokenState};
use crate::config::{secret_string, ServerConfig, SecretString};
use crate::domain::{FhirLinkError, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, Response};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{Instrument, Span};

/// Media type for FHIR JSON payloads
pub const FHIR_JSON: &str = "application/fhir+json";

const FHIR_JSON_UTF8: &str = "application/fhir+json;charset=UTF-8";

/// Connection settings for one FHIR endpoint
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint root without a trailing slash
    pub base_url: String,
    pub token: Option<SecretString>,
    /// Authorization scheme placed before the token, e.g. `Bearer`
    pub auth_type: String,
    pub extra_headers: BTreeMap<String, String>,
    pub tls_verify: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            auth_type: "Bearer".to_string(),
            extra_headers: BTreeMap::new(),
            tls_verify: true,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_token(mut self, auth_type: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth_type = auth_type.into();
        self.token = Some(secret_string(token.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_tls_verify(mut self, tls_verify: bool) -> Self {
        self.tls_verify = tls_verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&ServerConfig> for ClientConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            base_url: server.base_url.trim_end_matches('/').to_string(),
            token: server.token.clone(),
            auth_type: server.auth_type.clone(),
            extra_headers: server.extra_headers.clone(),
            tls_verify: server.tls_verify,
            timeout: Duration::from_secs(server.timeout_seconds),
        }
    }
}

/// Client for one FHIR server
///
/// Requests on a client are issued one at a time by the caller; the token
/// state is guarded so a shared client stays consistent anyway.
///
/// # Example
///
/// ```no_run
/// use fhirlink::adapters::fhir::{ClientConfig, FhirClient};
///
/// # async fn example() -> fhirlink::domain::Result<()> {
/// let client = FhirClient::new(
///     ClientConfig::new("https://fhir.example.com/r4").with_token("Bearer", "abc"),
/// )?;
/// let patient = client.read("Patient", "123").await?;
/// println!("{}", patient["id"]);
/// # Ok(())
/// # }
/// ```
pub struct FhirClient {
    config: ClientConfig,
    http: Client,
    extra_headers: HeaderMap,
    token: Mutex<TokenState>,
    refresher: Arc<dyn TokenRefresher>,
    span: Span,
}

impl FhirClient {
    /// Creates a client with a static token and no refresher
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an extra header is not a valid HTTP
    /// header or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            tracing::warn!(base_url = %config.base_url, "TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|e| {
            FhirLinkError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        let extra_headers = parse_headers(&config.extra_headers)?;
        let span = tracing::info_span!("fhir_client", base_url = %config.base_url);
        let token = Mutex::new(TokenState::new(config.token.clone()));

        Ok(Self {
            config,
            http,
            extra_headers,
            token,
            refresher: Arc::new(NoopRefresher),
            span,
        })
    }

    /// Creates a client from the `[server]` configuration section
    pub fn from_config(server: &ServerConfig) -> Result<Self> {
        Self::new(ClientConfig::from(server))
    }

    /// Replaces the token refresher
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    /// Authenticates with SMART backend services
    ///
    /// The refresher shares this client's connection pool. The first request
    /// triggers the token exchange because the stored token starts out
    /// expired.
    pub fn with_jwt_bearer(mut self, credentials: JwtCredentials) -> Self {
        let refresher =
            JwtBearerRefresher::new(self.http.clone(), self.config.base_url.clone(), credentials);
        self.refresher = Arc::new(refresher);
        self.token.get_mut().mark_expired();
        self
    }

    /// Endpoint root without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Span under which all requests of this client are logged
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Builds `{base}/{segment}/{segment}...`
    pub(crate) fn url(&self, segments: &[&str]) -> String {
        let mut url = self.config.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Returns a usable token, refreshing it first if it has expired
    ///
    /// # Errors
    ///
    /// Refresh failures are returned as-is; the request that needed the
    /// token is not attempted.
    pub async fn token(&self) -> Result<Option<SecretString>> {
        let mut state = self.token.lock().await;
        if state.is_expired(Utc::now()) {
            tracing::debug!("Access token expired, refreshing");
            if let Some(fresh) = self.refresher.refresh().await? {
                state.replace(fresh);
            }
        }
        Ok(state.token.clone())
    }

    /// Forces a token refresh regardless of expiry
    ///
    /// Returns `false` when the refresher had nothing to offer.
    pub async fn authenticate(&self) -> Result<bool> {
        let fresh = self.refresher.refresh().instrument(self.span.clone()).await?;
        match fresh {
            Some(fresh) => {
                self.token.lock().await.replace(fresh);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn headers(&self, prefer_async: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FHIR_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON_UTF8));

        if let Some(token) = self.token().await? {
            let token: &str = token.expose_secret().as_ref();
            if !token.is_empty() {
                let mut value = HeaderValue::from_str(&format!("{} {token}", self.config.auth_type))
                    .map_err(|_| {
                        FhirLinkError::Authentication(
                            "Token contains characters not allowed in a header".to_string(),
                        )
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        if prefer_async {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("respond-async"),
            );
        }

        Ok(headers)
    }

    /// Sends a request and returns the raw response, whatever its status
    ///
    /// A JSON body turns the request into whatever `method` says; callers
    /// pick GET for reads and POST for bodies.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        prefer_async: bool,
    ) -> Result<Response> {
        async {
            let headers = self.headers(prefer_async).await?;

            tracing::debug!(method = %method, url = %url, "Sending FHIR request");

            let mut request = self.http.request(method.clone(), url).headers(headers);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.body(serde_json::to_vec(body)?);
            }

            request
                .send()
                .await
                .map_err(|e| FhirLinkError::Transport(format!("{method} {url}: {e}")))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Sends a request and decodes the JSON answer
    ///
    /// An empty 2xx body decodes to `{}`.
    ///
    /// # Errors
    ///
    /// Non-2xx responses become [`FhirLinkError::Http`] carrying the body.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let response = self.send(method.clone(), url, query, body, false).await?;
        let response = ensure_success(&method, url, response).await?;
        decode_json(response).await
    }

    /// Sends a request asking for asynchronous processing
    ///
    /// The response is returned undecoded so the caller can look at the
    /// status and `Content-Location`.
    pub(crate) async fn execute_async(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let response = self.send(method.clone(), url, query, body, true).await?;
        ensure_success(&method, url, response).await
    }
}

/// Passes 2xx responses through and turns anything else into an error
pub(crate) async fn ensure_success(
    method: &Method,
    url: &str,
    response: Response,
) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    crate::log_http_failure!(method, url, status, body);
    Err(FhirLinkError::Http { status, body })
}

/// Decodes a JSON body, treating an empty body as `{}`
pub(crate) async fn decode_json(response: Response) -> Result<Value> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FhirLinkError::Transport(format!("Failed to read response body: {e}")))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Converts borrowed query pairs into the owned form [`FhirClient::send`] takes
pub(crate) fn owned_query(query: &[(&str, &str)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn parse_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            FhirLinkError::Configuration(format!("Invalid header name '{name}'"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            FhirLinkError::Configuration(format!("Invalid value for header '{name}'"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}
