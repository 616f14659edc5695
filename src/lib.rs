//! Harvest-Ripple: a concurrent, rate-limited content harvester
//!
//! This crate crawls websites with a pool of workers per site, following
//! discovered links and collecting arbitrary text (sentences, custom tokens)
//! matched by user-supplied regular expressions. Collected content is cached
//! in memory, bounded by per-collector limits, and flushed to plain text files.

pub mod collector;
pub mod config;
pub mod crawler;
pub mod fleet;
pub mod output;
pub mod parser;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Harvest-Ripple operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unable to start {label}: {reason}")]
    UnableToStart { label: String, reason: String },

    #[error("Page without links: {url}")]
    PageWithoutLinks { url: String },

    #[error("Failed to flush {name}: {source}")]
    Flush {
        name: String,
        source: std::io::Error,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::JobState,
        to: state::JobState,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Harvest-Ripple operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

// Re-export commonly used types
pub use collector::{ContentCollector, LinkCollector};
pub use config::Config;
pub use crawler::{OptionSet, ScrapeOption, Scraper, ScraperBuilder};
pub use fleet::Fleet;
pub use parser::{ParserDescriptor, StandardParser};
pub use state::JobState;
