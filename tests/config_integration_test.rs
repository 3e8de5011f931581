//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables hold ENV_MUTEX so they
//! do not interfere with each other.

use fhirlink::config::{load_config, parse_config, Environment};
use fhirlink::core::bulk::PollPolicy;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("FHIRLINK_APPLICATION_LOG_LEVEL");
    std::env::remove_var("FHIRLINK_SERVER_BASE_URL");
    std::env::remove_var("FHIRLINK_SERVER_TOKEN");
    std::env::remove_var("FHIRLINK_BULK_MAX_POLL_ERRORS");
    std::env::remove_var("FHIRLINK_BULK_OUTPUT_DIR");
    std::env::remove_var("TEST_FHIR_TOKEN");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
environment = "staging"

[application]
log_level = "debug"

[server]
base_url = "https://fhir.example.com/r4/"
auth_type = "Bearer"
token = "static-token"
tls_verify = true
timeout_seconds = 60

[server.extra_headers]
"X-Tenant" = "acme"

[oauth]
client_id = "backend-service"
key_id = "key-1"
private_key = "hmac-secret"
algorithm = "HS384"

[bulk]
default_polling_seconds = 30
max_poll_errors = 5
deadline_seconds = 3600
output_dir = "/tmp/fhirlink-export"

[logging]
local_enabled = true
local_path = "/tmp/fhirlink-logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.server.base_url, "https://fhir.example.com/r4/");
    assert_eq!(config.server.timeout_seconds, 60);
    assert_eq!(config.server.extra_headers.get("X-Tenant").unwrap(), "acme");

    let oauth = config.oauth.as_ref().unwrap();
    assert_eq!(oauth.client_id, "backend-service");
    assert_eq!(oauth.algorithm, "HS384");

    let policy = PollPolicy::from_config(&config.bulk);
    assert_eq!(policy.interval, Duration::from_secs(30));
    assert_eq!(policy.max_errors, 5);
    assert_eq!(policy.deadline, Some(Duration::from_secs(3600)));

    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_minimal_config_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let config = parse_config(
        r#"
[server]
base_url = "http://localhost:8080/fhir"
"#,
    )
    .unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.server.auth_type, "Bearer");
    assert!(config.server.token.is_none());
    assert!(config.server.tls_verify);
    assert!(config.oauth.is_none());
    assert_eq!(config.bulk.default_polling_seconds, 120);
    assert_eq!(config.bulk.max_poll_errors, 3);
    assert!(config.bulk.deadline_seconds.is_none());
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_FHIR_TOKEN", "from-env");

    let config = parse_config(
        r#"
[server]
base_url = "http://localhost:8080/fhir"
token = "${TEST_FHIR_TOKEN}"
"#,
    )
    .unwrap();

    let token = config.server.token.unwrap();
    let token: &str = token.expose_secret().as_ref();
    assert_eq!(token, "from-env");

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let err = parse_config(
        r#"
[server]
base_url = "http://localhost:8080/fhir"
token = "${TEST_FHIR_TOKEN}"
"#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("TEST_FHIR_TOKEN"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("FHIRLINK_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("FHIRLINK_SERVER_BASE_URL", "https://override.example.com/fhir");
    std::env::set_var("FHIRLINK_SERVER_TOKEN", "override-token");
    std::env::set_var("FHIRLINK_BULK_MAX_POLL_ERRORS", "7");
    std::env::set_var("FHIRLINK_BULK_OUTPUT_DIR", "/tmp/override");

    let config = parse_config(
        r#"
[application]
log_level = "info"

[server]
base_url = "http://localhost:8080/fhir"

[bulk]
max_poll_errors = 3
"#,
    )
    .unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.server.base_url, "https://override.example.com/fhir");
    assert!(config.server.token.is_some());
    assert_eq!(config.bulk.max_poll_errors, 7);
    assert_eq!(config.bulk.output_dir, "/tmp/override");

    cleanup_env_vars();
}

#[test]
fn test_invalid_configs_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        // Unknown log level
        "[application]\nlog_level = \"verbose\"\n[server]\nbase_url = \"http://localhost/fhir\"\n",
        // Zero polling interval
        "[server]\nbase_url = \"http://localhost/fhir\"\n[bulk]\ndefault_polling_seconds = 0\n",
        // OAuth without key material
        "[server]\nbase_url = \"http://localhost/fhir\"\n[oauth]\nclient_id = \"c\"\nkey_id = \"k\"\n",
        // TLS verification off in production
        "environment = \"production\"\n[server]\nbase_url = \"https://fhir.example.com\"\ntls_verify = false\n",
        // Unknown rotation
        "[server]\nbase_url = \"http://localhost/fhir\"\n[logging]\nlocal_rotation = \"size\"\n",
    ];

    for case in cases {
        assert!(parse_config(case).is_err(), "accepted invalid config:\n{case}");
    }
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/fhirlink.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
