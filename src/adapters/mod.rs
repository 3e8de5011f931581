//! External system integrations for FhirLink.
//!
//! - [`fhir`] - FHIR REST server: requests, authentication, resource operations
//! - [`storage`] - Destinations for downloaded bulk output files
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind small types and traits so
//! the bulk workflow in [`crate::core`] can be tested against a mock server
//! and a temporary directory.

pub mod fhir;
pub mod storage;
