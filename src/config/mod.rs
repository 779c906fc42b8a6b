//! Configuration module for Link-Vigil
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turning them into [`CheckOptions`](crate::probe::CheckOptions).
//!
//! # Example
//!
//! ```no_run
//! use link_vigil::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("link-vigil.toml")).unwrap();
//! println!("Per-attempt timeout: {}ms", config.checker.timeout_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AllowedAnchorEntry, CacheConfig, CheckerConfig, Config, NetworkConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
