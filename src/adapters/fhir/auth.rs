//! Bearer token acquisition
//!
//! The client asks a [`TokenRefresher`] for a new token whenever the stored
//! one has expired. [`NoopRefresher`] keeps whatever static token was
//! configured; [`JwtBearerRefresher`] implements SMART backend services
//! authentication: a signed JWT assertion exchanged at the server's token
//! endpoint for an access token.

use crate::config::{secret_string, OAuthConfig, SecretString};
use crate::domain::{FhirLinkError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

/// `client_assertion_type` value for JWT bearer client authentication
pub const JWT_BEARER_ASSERTION_TYPE: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of a signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Token lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 300;

/// A bearer token and the instant after which it must be refreshed
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Source of fresh bearer tokens
///
/// `Ok(None)` means the refresher has nothing new to offer and the current
/// token stays in place.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<Option<AccessToken>>;
}

/// Refresher for deployments with a static token, or none at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresher;

#[async_trait]
impl TokenRefresher for NoopRefresher {
    async fn refresh(&self) -> Result<Option<AccessToken>> {
        Ok(None)
    }
}

/// Token currently held by a client
#[derive(Debug, Default)]
pub(crate) struct TokenState {
    pub(crate) token: Option<SecretString>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    pub(crate) fn new(token: Option<SecretString>) -> Self {
        Self {
            token,
            expires_at: None,
        }
    }

    /// A token without an expiry never expires
    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }

    /// Forces a refresh before the next request
    pub(crate) fn mark_expired(&mut self) {
        self.expires_at = Some(DateTime::<Utc>::MIN_UTC);
    }

    pub(crate) fn replace(&mut self, fresh: AccessToken) {
        self.token = Some(fresh.token);
        self.expires_at = fresh.expires_at;
    }
}

/// Signing material for SMART backend services assertions
#[derive(Clone)]
pub struct JwtCredentials {
    client_id: String,
    key_id: String,
    key: EncodingKey,
    algorithm: Algorithm,
    jku: Option<String>,
}

impl JwtCredentials {
    /// Creates credentials from key material matching `algorithm`
    ///
    /// HMAC algorithms take the raw secret; RSA, ECDSA and EdDSA
    /// algorithms take a PEM-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key cannot be parsed for the
    /// chosen algorithm.
    pub fn new(
        client_id: impl Into<String>,
        key_id: impl Into<String>,
        key: &[u8],
        algorithm: Algorithm,
        jku: Option<String>,
    ) -> Result<Self> {
        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => EncodingKey::from_secret(key),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => EncodingKey::from_rsa_pem(key).map_err(key_error)?,
            Algorithm::ES256 | Algorithm::ES384 => {
                EncodingKey::from_ec_pem(key).map_err(key_error)?
            }
            Algorithm::EdDSA => EncodingKey::from_ed_pem(key).map_err(key_error)?,
        };

        Ok(Self {
            client_id: client_id.into(),
            key_id: key_id.into(),
            key,
            algorithm,
            jku,
        })
    }

    /// Creates credentials from the `[oauth]` configuration section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key file cannot be read, or the
    /// algorithm or key is invalid.
    pub fn from_config(config: &OAuthConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        let algorithm: Algorithm = config.algorithm.parse().map_err(|_| {
            FhirLinkError::Configuration(format!("Invalid oauth.algorithm '{}'", config.algorithm))
        })?;

        let key = match (&config.private_key, &config.private_key_path) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => {
                let pem = std::fs::read_to_string(path).map_err(|e| {
                    FhirLinkError::Configuration(format!(
                        "Failed to read private key {path}: {e}"
                    ))
                })?;
                secret_string(pem)
            }
            (None, None) => {
                return Err(FhirLinkError::Configuration(
                    "oauth requires either private_key or private_key_path".to_string(),
                ))
            }
        };

        Self::new(
            config.client_id.clone(),
            config.key_id.clone(),
            key.expose_secret().as_bytes(),
            algorithm,
            config.jku.clone(),
        )
    }

    /// Client id used as assertion issuer and subject
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Signs an assertion addressed to `token_endpoint`
    pub fn sign_assertion(&self, token_endpoint: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_id,
            sub: &self.client_id,
            aud: token_endpoint,
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            jku: self.jku.as_deref(),
        };

        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.key_id.clone());

        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| FhirLinkError::Authentication(format!("Failed to sign assertion: {e}")))
    }
}

fn key_error(err: jsonwebtoken::errors::Error) -> FhirLinkError {
    FhirLinkError::Configuration(format!("Invalid private key: {err}"))
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
    jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    jku: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// SMART backend services token refresher
///
/// The token endpoint is discovered once from
/// `{base}/.well-known/smart-configuration` and reused afterwards.
pub struct JwtBearerRefresher {
    http: Client,
    base_url: String,
    credentials: JwtCredentials,
    token_endpoint: OnceCell<String>,
}

impl JwtBearerRefresher {
    /// Creates a refresher that talks to the server at `base_url`
    pub fn new(http: Client, base_url: impl Into<String>, credentials: JwtCredentials) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token_endpoint: OnceCell::new(),
        }
    }

    async fn token_endpoint(&self) -> Result<&str> {
        let endpoint = self
            .token_endpoint
            .get_or_try_init(|| async {
                let smart = fetch_smart_configuration(&self.http, &self.base_url)
                    .await
                    .map_err(|e| {
                        FhirLinkError::Authentication(format!("SMART discovery failed: {e}"))
                    })?;
                smart
                    .get("token_endpoint")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        FhirLinkError::Authentication(
                            "SMART configuration has no token_endpoint".to_string(),
                        )
                    })
            })
            .await?;
        Ok(endpoint.as_str())
    }

    /// Performs the client-credentials exchange
    ///
    /// # Errors
    ///
    /// Returns an authentication error when discovery fails, the assertion
    /// cannot be signed, or the token endpoint answers with a non-2xx status.
    pub async fn exchange(&self) -> Result<AccessToken> {
        let token_endpoint = self.token_endpoint().await?;
        let now = Utc::now();
        let assertion = self.credentials.sign_assertion(token_endpoint, now)?;

        tracing::debug!(
            client_id = %self.credentials.client_id(),
            token_endpoint = %token_endpoint,
            "Requesting access token"
        );

        let response = self
            .http
            .post(token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_assertion_type", JWT_BEARER_ASSERTION_TYPE),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FhirLinkError::Transport(format!("POST {token_endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Token exchange failed");
            return Err(FhirLinkError::Authentication(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            FhirLinkError::Authentication(format!("Invalid token response: {e}"))
        })?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = now + Duration::seconds(lifetime);

        tracing::info!(expires_at = %expires_at, "Access token acquired");

        Ok(AccessToken {
            token: secret_string(token.access_token),
            expires_at: Some(expires_at),
        })
    }
}

#[async_trait]
impl TokenRefresher for JwtBearerRefresher {
    async fn refresh(&self) -> Result<Option<AccessToken>> {
        self.exchange().await.map(Some)
    }
}

/// GETs `{base}/.well-known/smart-configuration`
///
/// Non-2xx answers come back as [`FhirLinkError::Http`].
pub(crate) async fn fetch_smart_configuration(http: &Client, base_url: &str) -> Result<Value> {
    let url = format!("{base_url}/.well-known/smart-configuration");
    let response = http
        .get(&url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| FhirLinkError::Transport(format!("GET {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        crate::log_http_failure!("GET", url, status.as_u16(), body);
        return Err(FhirLinkError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| FhirLinkError::Serialization(format!("Invalid SMART configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use secrecy::ExposeSecret;

    const SECRET: &[u8] = b"super-secret-signing-key";

    fn credentials(jku: Option<String>) -> JwtCredentials {
        JwtCredentials::new("client-1", "key-1", SECRET, Algorithm::HS384, jku).unwrap()
    }

    #[test]
    fn test_token_state_expiry() {
        let now = Utc::now();
        let mut state = TokenState::new(Some(secret_string("t".to_string())));
        assert!(!state.is_expired(now));

        state.expires_at = Some(now - Duration::seconds(1));
        assert!(state.is_expired(now));

        state.replace(AccessToken {
            token: secret_string("fresh".to_string()),
            expires_at: Some(now + Duration::seconds(60)),
        });
        assert!(!state.is_expired(now));
        assert_eq!(state.token.unwrap().expose_secret(), "fresh");
    }

    #[tokio::test]
    async fn test_noop_refresher_offers_nothing() {
        assert!(NoopRefresher.refresh().await.unwrap().is_none());
    }

    #[test]
    fn test_assertion_claims_and_header() {
        let now = Utc::now();
        let jwt = credentials(Some("https://client/jwks.json".to_string()))
            .sign_assertion("https://auth/token", now)
            .unwrap();

        let header = decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::HS384);
        assert_eq!(header.kid.as_deref(), Some("key-1"));

        let mut validation = Validation::new(Algorithm::HS384);
        validation.set_audience(&["https://auth/token"]);
        let data = decode::<Value>(&jwt, &DecodingKey::from_secret(SECRET), &validation).unwrap();

        assert_eq!(data.claims["iss"], "client-1");
        assert_eq!(data.claims["sub"], "client-1");
        assert_eq!(data.claims["jku"], "https://client/jwks.json");
        assert_eq!(
            data.claims["exp"].as_i64().unwrap(),
            now.timestamp() + ASSERTION_LIFETIME_SECS
        );
        assert!(!data.claims["jti"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_assertion_jti_is_unique_and_jku_optional() {
        let creds = credentials(None);
        let now = Utc::now();
        let a = creds.sign_assertion("https://auth/token", now).unwrap();
        let b = creds.sign_assertion("https://auth/token", now).unwrap();
        assert_ne!(a, b);

        let mut validation = Validation::new(Algorithm::HS384);
        validation.set_audience(&["https://auth/token"]);
        let data = decode::<Value>(&a, &DecodingKey::from_secret(SECRET), &validation).unwrap();
        assert!(data.claims.get("jku").is_none());
    }

    #[test]
    fn test_rsa_algorithm_rejects_non_pem_key() {
        let result = JwtCredentials::new("c", "k", b"not a pem", Algorithm::RS384, None);
        assert!(matches!(result, Err(FhirLinkError::Configuration(_))));
    }

    #[test]
    fn test_from_config_reads_inline_secret() {
        let config = OAuthConfig {
            client_id: "client-1".to_string(),
            key_id: "key-1".to_string(),
            private_key: Some(secret_string("inline-secret".to_string())),
            private_key_path: None,
            jku: None,
            algorithm: "HS256".to_string(),
        };
        let creds = JwtCredentials::from_config(&config).unwrap();
        assert_eq!(creds.client_id(), "client-1");
    }

    #[test]
    fn test_from_config_missing_key_file() {
        let config = OAuthConfig {
            client_id: "client-1".to_string(),
            key_id: "key-1".to_string(),
            private_key: None,
            private_key_path: Some("/nonexistent/key.pem".to_string()),
            jku: None,
            algorithm: "RS384".to_string(),
        };
        assert!(matches!(
            JwtCredentials::from_config(&config),
            Err(FhirLinkError::Configuration(_))
        ));
    }
}
