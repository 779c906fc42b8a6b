//! Link-Vigil: a link-liveness verification engine
//!
//! Given external URLs discovered in documents, this crate decides whether each
//! one is reachable, whether it resolves to a valid resource, and optionally
//! whether the named anchor inside that resource exists.
//!
//! The flow for a single URL is: result cache lookup, per-domain pacing, the
//! redirect/retry probe itself (with meta-refresh resolution and anchor
//! matching), then a write-through to the cache.

pub mod anchor;
pub mod cache;
pub mod checker;
pub mod config;
pub mod fallback;
pub mod html;
pub mod limiter;
pub mod probe;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Link-Vigil operations
///
/// Probe failures are never reported through this type; they are
/// [`probe::Outcome::Error`] values. Only setup problems end up here.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
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

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// Result type alias for Link-Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checker::{check_urls, Checker};
pub use config::Config;
pub use probe::{CheckOptions, Outcome, ProbeError, Prober, UrlStatus};
