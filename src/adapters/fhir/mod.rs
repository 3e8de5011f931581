//! FHIR server integration
//!
//! - [`client`] - connection settings, headers and the request executor
//! - [`auth`] - bearer token refresh, including SMART backend services
//! - [`operations`] - CRUD, search and named operations
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirlink::adapters::fhir::{ClientConfig, FhirClient};
//!
//! # async fn example() -> fhirlink::domain::Result<()> {
//! let client = FhirClient::new(ClientConfig::new("https://fhir.example.com/r4"))?;
//! let page = client.search("Patient", &[("family", "Smith")]).await?;
//! if let Some(next) = client.search_next(&page).await? {
//!     println!("{}", next["total"]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod operations;

pub use auth::{AccessToken, JwtBearerRefresher, JwtCredentials, NoopRefresher, TokenRefresher};
pub use client::{ClientConfig, FhirClient, FHIR_JSON};
pub use operations::{GroupOperation, DEFAULT_EVERYTHING_COUNT};
