// FhirLink - FHIR REST and Bulk Data client
// Copyright (c) 2025 FhirLink Contributors
// Licensed under the MIT License

//! # FhirLink - FHIR REST and Bulk Data client
//!
//! FhirLink talks to FHIR servers over HTTPS: CRUD and search on resources,
//! named operations such as `$match` and `$validate`, SMART backend services
//! authentication, and the asynchronous Bulk Data workflow (kick-off, status
//! polling, output download).
//!
//! ## Architecture
//!
//! FhirLink follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Bulk workflow (launcher, poller, materializer)
//! - [`adapters`] - External integrations (FHIR server, output storage)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhirlink::adapters::fhir::FhirClient;
//! use fhirlink::adapters::storage::DirectorySink;
//! use fhirlink::config::load_config;
//! use fhirlink::core::bulk::{BulkCoordinator, ExportRequest, PollPolicy};
//! use fhirlink::domain::JobManifest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fhirlink.toml")?;
//!     let client = FhirClient::from_config(&config.server)?;
//!
//!     let coordinator = BulkCoordinator::new(&client, PollPolicy::from_config(&config.bulk));
//!     let request = ExportRequest::patient().with_types(["Patient", "Observation"]);
//!
//!     let manifest = JobManifest::from_value(&coordinator.export(&request).await?)?;
//!     let files = coordinator
//!         .materialize(&manifest, &DirectorySink::new(&config.bulk.output_dir))
//!         .await?;
//!
//!     println!("Exported {} files", files.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Resource Operations
//!
//! ```rust,no_run
//! use fhirlink::adapters::fhir::{ClientConfig, FhirClient};
//! use serde_json::json;
//!
//! # async fn example() -> fhirlink::domain::Result<()> {
//! let client = FhirClient::new(
//!     ClientConfig::new("https://fhir.example.com/r4").with_token("Bearer", "token"),
//! )?;
//!
//! let created = client
//!     .create("Patient", &json!({"resourceType": "Patient", "gender": "female"}))
//!     .await?;
//! let id = created["id"].as_str().unwrap_or_default();
//!
//! let patient = client.read("Patient", id).await?;
//! client.member_add("cohort-1", &format!("Patient/{id}")).await?;
//! client.delete("Patient", id).await?;
//! # let _ = patient;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! FhirLink uses the [`domain::FhirLinkError`] type for all errors:
//!
//! ```rust,no_run
//! use fhirlink::domain::FhirLinkError;
//!
//! fn example() -> Result<(), FhirLinkError> {
//!     let config = fhirlink::config::load_config("fhirlink.toml")?;
//!     # let _ = config;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! The library only emits `tracing` events. Each [`adapters::fhir::FhirClient`]
//! carries a span with its base URL, so events from concurrent clients stay
//! apart; installing a subscriber is left to the application (see
//! [`logging::init_logging`]).

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
