//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FhirLinkConfig;
use super::secret::secret_string;
use crate::domain::errors::FhirLinkError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FhirLinkConfig
/// 4. Applies environment variable overrides (FHIRLINK_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed,
/// a referenced environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use fhirlink::config::loader::load_config;
///
/// let config = load_config("fhirlink.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FhirLinkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FhirLinkError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FhirLinkError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn parse_config(contents: &str) -> Result<FhirLinkConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FhirLinkConfig = toml::from_str(&contents)
        .map_err(|e| FhirLinkError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        FhirLinkError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| FhirLinkError::Configuration(e.to_string()))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FhirLinkError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using FHIRLINK_* prefix
///
/// Environment variables follow the pattern: FHIRLINK_<SECTION>_<KEY>,
/// for example FHIRLINK_SERVER_BASE_URL or FHIRLINK_BULK_OUTPUT_DIR.
fn apply_env_overrides(config: &mut FhirLinkConfig) {
    if let Ok(val) = std::env::var("FHIRLINK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Server overrides
    if let Ok(val) = std::env::var("FHIRLINK_SERVER_BASE_URL") {
        config.server.base_url = val;
    }
    if let Ok(val) = std::env::var("FHIRLINK_SERVER_AUTH_TYPE") {
        config.server.auth_type = val;
    }
    if let Ok(val) = std::env::var("FHIRLINK_SERVER_TOKEN") {
        config.server.token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("FHIRLINK_SERVER_TLS_VERIFY") {
        config.server.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FHIRLINK_SERVER_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.server.timeout_seconds = timeout;
        }
    }

    // OAuth overrides (only if an [oauth] section is configured)
    if let Some(ref mut oauth) = config.oauth {
        if let Ok(val) = std::env::var("FHIRLINK_OAUTH_CLIENT_ID") {
            oauth.client_id = val;
        }
        if let Ok(val) = std::env::var("FHIRLINK_OAUTH_KEY_ID") {
            oauth.key_id = val;
        }
        if let Ok(val) = std::env::var("FHIRLINK_OAUTH_PRIVATE_KEY_PATH") {
            oauth.private_key = None;
            oauth.private_key_path = Some(val);
        }
    }

    // Bulk overrides
    if let Ok(val) = std::env::var("FHIRLINK_BULK_DEFAULT_POLLING_SECONDS") {
        if let Ok(seconds) = val.parse() {
            config.bulk.default_polling_seconds = seconds;
        }
    }
    if let Ok(val) = std::env::var("FHIRLINK_BULK_MAX_POLL_ERRORS") {
        if let Ok(errors) = val.parse() {
            config.bulk.max_poll_errors = errors;
        }
    }
    if let Ok(val) = std::env::var("FHIRLINK_BULK_DEADLINE_SECONDS") {
        if let Ok(seconds) = val.parse() {
            config.bulk.deadline_seconds = Some(seconds);
        }
    }
    if let Ok(val) = std::env::var("FHIRLINK_BULK_OUTPUT_DIR") {
        config.bulk.output_dir = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FHIRLINK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FHIRLINK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FHIRLINK_TEST_TOKEN_VALUE", "test_value");
        let input = "token = \"${FHIRLINK_TEST_TOKEN_VALUE}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "token = \"test_value\"\n");
        std::env::remove_var("FHIRLINK_TEST_TOKEN_VALUE");
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# token = \"${FHIRLINK_TEST_NEVER_SET}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${FHIRLINK_TEST_NEVER_SET}"));
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("FHIRLINK_TEST_MISSING_VAR");
        let input = "token = \"${FHIRLINK_TEST_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(FhirLinkError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[server]
base_url = "https://fhir.example.com/r4"

[bulk]
default_polling_seconds = 30
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.base_url, "https://fhir.example.com/r4");
        assert_eq!(config.bulk.default_polling_seconds, 30);
        assert_eq!(config.bulk.max_poll_errors, 3);
        assert!(config.oauth.is_none());
    }
}
