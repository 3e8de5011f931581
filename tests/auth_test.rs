//! Integration tests for SMART backend services authentication
//!
//! These tests verify that:
//! - The token endpoint is discovered once and the exchange sends a signed assertion
//! - The acquired token is attached to later requests
//! - Expired tokens are refreshed before the request goes out
//! - Exchange failures stop the request and surface as authentication errors

use async_trait::async_trait;
use fhirlink::adapters::fhir::{
    AccessToken, ClientConfig, FhirClient, JwtCredentials, TokenRefresher,
};
use fhirlink::config::{secret_string, SecretString};
use fhirlink::domain::{FhirLinkError, Result};
use jsonwebtoken::Algorithm;
use mockito::{Matcher, Mock, Server};
use secrecy::ExposeSecret;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn credentials() -> JwtCredentials {
    JwtCredentials::new(
        "backend-service",
        "key-1",
        b"a-test-secret-of-reasonable-length",
        Algorithm::HS256,
        None,
    )
    .unwrap()
}

fn jwt_client(server: &Server) -> FhirClient {
    FhirClient::new(ClientConfig::new(server.url()))
        .unwrap()
        .with_jwt_bearer(credentials())
}

async fn smart_configuration(server: &mut Server) -> Mock {
    let body = json!({
        "token_endpoint": format!("{}/auth/token", server.url()),
        "grant_types_supported": ["client_credentials"]
    })
    .to_string();

    server
        .mock("GET", "/.well-known/smart-configuration")
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

fn exposed(token: &SecretString) -> String {
    let token: &str = token.expose_secret().as_ref();
    token.to_string()
}

#[tokio::test]
async fn test_token_exchange_and_bearer_header() {
    let mut server = Server::new_async().await;
    let discovery = smart_configuration(&mut server).await;

    let token = server
        .mock("POST", "/auth/token")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            Matcher::UrlEncoded(
                "client_assertion_type".into(),
                "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".into(),
            ),
            Matcher::Regex("client_assertion=[A-Za-z0-9_-]+\\.[A-Za-z0-9_-]+\\.[A-Za-z0-9_-]+".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok-1","token_type":"bearer","expires_in":300}"#)
        .expect(1)
        .create_async()
        .await;

    let read = server
        .mock("GET", "/Patient/p1")
        .match_header("authorization", "Bearer tok-1")
        .with_body(r#"{"resourceType":"Patient","id":"p1"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = jwt_client(&server);
    client.read("Patient", "p1").await.unwrap();
    // Second call reuses the cached token and endpoint
    client.read("Patient", "p1").await.unwrap();

    discovery.assert_async().await;
    token.assert_async().await;
    read.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let mut server = Server::new_async().await;
    smart_configuration(&mut server).await;

    let token = server
        .mock("POST", "/auth/token")
        .with_body(r#"{"access_token":"short-lived","expires_in":0}"#)
        .expect(2)
        .create_async()
        .await;

    server
        .mock("GET", "/metadata")
        .match_header("authorization", "Bearer short-lived")
        .with_body(r#"{"resourceType":"CapabilityStatement"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = jwt_client(&server);
    client.metadata().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    client.metadata().await.unwrap();

    token.assert_async().await;
}

#[tokio::test]
async fn test_token_endpoint_rejection_stops_request() {
    let mut server = Server::new_async().await;
    smart_configuration(&mut server).await;

    server
        .mock("POST", "/auth/token")
        .with_status(401)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let read = server
        .mock("GET", "/Patient/p1")
        .expect(0)
        .create_async()
        .await;

    let client = jwt_client(&server);
    let err = client.read("Patient", "p1").await.unwrap_err();

    match err {
        FhirLinkError::Authentication(message) => assert!(message.contains("invalid_client")),
        other => panic!("unexpected error: {other:?}"),
    }
    read.assert_async().await;
}

#[tokio::test]
async fn test_missing_smart_configuration() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/.well-known/smart-configuration")
        .with_status(404)
        .create_async()
        .await;

    let client = jwt_client(&server);
    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, FhirLinkError::Authentication(_)));
}

#[tokio::test]
async fn test_smart_configuration_lookup() {
    let mut server = Server::new_async().await;
    smart_configuration(&mut server).await;

    let client = FhirClient::new(ClientConfig::new(server.url())).unwrap();
    let smart = client.smart_configuration().await.unwrap();
    assert_eq!(smart["grant_types_supported"][0], "client_credentials");
}

#[tokio::test]
async fn test_authenticate_with_static_token() {
    let client = FhirClient::new(
        ClientConfig::new("http://localhost:8080/fhir").with_token("Bearer", "static"),
    )
    .unwrap();

    // Nothing to refresh; the static token stays
    assert!(!client.authenticate().await.unwrap());
    let token = client.token().await.unwrap().unwrap();
    assert_eq!(exposed(&token), "static");
}

/// Hands out numbered tokens
struct CountingRefresher {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self) -> Result<Option<AccessToken>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(AccessToken {
            token: secret_string(format!("token-{n}")),
            expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        }))
    }
}

#[tokio::test]
async fn test_custom_refresher() {
    let refresher = Arc::new(CountingRefresher {
        calls: AtomicUsize::new(0),
    });
    let client = FhirClient::new(ClientConfig::new("http://localhost:8080/fhir"))
        .unwrap()
        .with_refresher(refresher.clone());

    // No expiry on the initial (absent) token, so nothing is refreshed yet
    assert!(client.token().await.unwrap().is_none());
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);

    assert!(client.authenticate().await.unwrap());
    let token = client.token().await.unwrap().unwrap();
    assert_eq!(exposed(&token), "token-1");
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
}
