//! Configuration module for Harvest-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turning the configured jobs into a fleet.
//!
//! # Example
//!
//! ```no_run
//! use harvest_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Configured jobs: {}", config.jobs.len());
//! ```

mod jobs;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, JobConfig, OutputConfig, PatternConfig, UserAgentConfig};

// Re-export parser functions
pub use jobs::{build_fleet, job_builders};
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
