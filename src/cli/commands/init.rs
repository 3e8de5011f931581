//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG, EXIT_OK, EXIT_REMOTE_FAILURE};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fhirlink.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing FhirLink configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your server's base_url", self.output);
                println!("  2. Either set a static token (FHIRLINK_SERVER_TOKEN)");
                println!("     or fill in the [oauth] section for SMART backend services");
                println!("  3. Validate configuration: fhirlink validate-config");
                println!("  4. Check connectivity: fhirlink metadata --summary");
                println!("  5. Run an export: fhirlink export --types Patient,Observation");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_REMOTE_FAILURE)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# FhirLink Configuration File

[application]
log_level = "info"

[server]
base_url = "https://fhir.example.com/r4"
auth_type = "Bearer"

[bulk]
default_polling_seconds = 120
max_poll_errors = 3
output_dir = "./export"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# FhirLink Configuration File
# FHIR REST and Bulk Data client
#
# Values may reference environment variables as ${VAR_NAME}; every key can
# also be overridden with FHIRLINK_<SECTION>_<KEY>, e.g. FHIRLINK_SERVER_BASE_URL.

# development | staging | production
environment = "development"

[application]
# trace | debug | info | warn | error
log_level = "info"

[server]
# Endpoint root; a trailing slash is ignored
base_url = "https://fhir.example.com/r4"

# Scheme placed before the token in the Authorization header
auth_type = "Bearer"

# Static token. Leave unset when using [oauth] below.
# token = "${FHIRLINK_SERVER_TOKEN}"

# Certificate verification; cannot be disabled in production
tls_verify = true

# Per-request timeout, also bounds each output file download
timeout_seconds = 300

# Headers added to every request
[server.extra_headers]
# "X-Tenant" = "acme"

# SMART backend services: a signed JWT assertion is exchanged for an access
# token at the token endpoint advertised in .well-known/smart-configuration.
# [oauth]
# client_id = "my-backend-service"
# key_id = "key-2024"
# private_key_path = "/etc/fhirlink/client.pem"
# jku = "https://my-service.example.com/.well-known/jwks.json"
# algorithm = "RS384"

[bulk]
# Wait between status polls, and the cap for server-requested Retry-After
default_polling_seconds = 120

# Consecutive status errors tolerated before the job is abandoned
max_poll_errors = 3

# Give up on a job after this many seconds (unset = wait indefinitely)
# deadline_seconds = 3600

# Where downloaded NDJSON files are written
output_dir = "./export"

[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "./logs"
# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FhirLinkConfig;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "fhirlink.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "fhirlink.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[application]"));
        assert!(config.contains("[server]"));
        assert!(config.contains("[bulk]"));

        let parsed: FhirLinkConfig = toml::from_str(&config).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.bulk.output_dir, "./export");
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# FhirLink Configuration File"));
        assert!(config.contains("# [oauth]"));
        assert!(config.contains("max_poll_errors"));

        let parsed: FhirLinkConfig = toml::from_str(&config).unwrap();
        assert!(parsed.validate().is_ok());
        assert!(parsed.oauth.is_none());
        assert!(parsed.server.extra_headers.is_empty());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = InitArgs {
            output: file.path().display().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG);
    }
}
