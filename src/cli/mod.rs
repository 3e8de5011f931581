//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for FhirLink using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// FhirLink - FHIR REST and Bulk Data client
#[derive(Parser, Debug)]
#[command(name = "fhirlink")]
#[command(version, about, long_about = None)]
#[command(author = "FhirLink Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhirlink.toml", env = "FHIRLINK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIRLINK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the server's CapabilityStatement
    Metadata(commands::metadata::MetadataArgs),

    /// Read one resource by type and id
    Read(commands::read::ReadArgs),

    /// Search a resource type
    Search(commands::search::SearchArgs),

    /// Run a bulk export and download its output files
    Export(commands::export::ExportArgs),

    /// Run a bulk patient match and download its output files
    BulkMatch(commands::bulk_match::BulkMatchArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
