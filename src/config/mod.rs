//! Configuration management for FhirLink.
//!
//! FhirLink reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FHIRLINK_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`ServerConfig`] - FHIR endpoint, static token, TLS and extra headers
//! - [`OAuthConfig`] - SMART backend services credentials
//! - [`BulkConfig`] - Poll interval, error tolerance, deadline, output directory
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! base_url = "https://fhir.example.com/r4"
//! auth_type = "Bearer"
//!
//! [oauth]
//! client_id = "my-backend-service"
//! key_id = "key-2024"
//! private_key_path = "/etc/fhirlink/client.pem"
//! algorithm = "RS384"
//!
//! [bulk]
//! default_polling_seconds = 120
//! max_poll_errors = 3
//! output_dir = "./export"
//! ```
//!
//! # Loading
//!
//! ```rust,no_run
//! use fhirlink::config::load_config;
//!
//! # fn example() {
//! match load_config("fhirlink.toml") {
//!     Ok(config) => println!("FHIR server: {}", config.server.base_url),
//!     Err(e) => eprintln!("Configuration error: {}", e),
//! }
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BulkConfig, Environment, FhirLinkConfig, LoggingConfig, OAuthConfig,
    ServerConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
