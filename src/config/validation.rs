use crate::config::types::{AllowedAnchorEntry, CacheConfig, CheckerConfig, Config};
use crate::url::is_valid_pattern;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashMap;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_checker_config(&config.checker)?;
    validate_cache_config(&config.cache)?;
    validate_allowed_status_codes(&config.allowed_status_codes)?;
    validate_allowed_anchors(&config.allowed_anchor)?;
    Ok(())
}

/// Validates checker configuration
fn validate_checker_config(config: &CheckerConfig) -> Result<(), ConfigError> {
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout-ms must be greater than 0".to_string(),
        ));
    }

    if config.max_concurrent_checks < 1 || config.max_concurrent_checks > 1024 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-checks must be between 1 and 1024, got {}",
            config.max_concurrent_checks
        )));
    }

    for pattern in &config.ignore_urls {
        compile_regex(pattern)?;
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache path cannot be empty while the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates host patterns and their status codes
fn validate_allowed_status_codes(by_host: &HashMap<String, Vec<u16>>) -> Result<(), ConfigError> {
    for (pattern, codes) in by_host {
        if !is_valid_pattern(&pattern.to_ascii_lowercase()) {
            return Err(ConfigError::InvalidPattern(format!(
                "'{}' is not a valid host pattern",
                pattern
            )));
        }

        if let Some(code) = codes.iter().find(|c| !(100..=599).contains(*c)) {
            return Err(ConfigError::Validation(format!(
                "Status code {} for '{}' must be between 100 and 599",
                code, pattern
            )));
        }
    }

    Ok(())
}

/// Validates that every anchor allow-list pattern compiles
fn validate_allowed_anchors(entries: &[AllowedAnchorEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        compile_regex(&entry.url)?;
        compile_regex(&entry.fragment)?;
    }
    Ok(())
}

/// Compiles a pattern, naming it in the error
pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}
