use crate::anchor::AnchorAllowlist;
use crate::cache::CacheTtl;
use crate::config::validation::compile_regex;
use crate::probe::{
    CheckOptions, NetworkSettings, DEFAULT_MAX_CONCURRENT_CHECKS, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RETRIES,
    DEFAULT_USER_AGENT,
};
use crate::url::IgnoreRules;
use crate::ConfigError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Main configuration structure for Link-Vigil
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub checker: CheckerConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Host pattern -> status codes treated as success
    #[serde(default, rename = "allowed-status-codes")]
    pub allowed_status_codes: HashMap<String, Vec<u16>>,

    /// Fragments that skip the existence check; the built-in rules apply when empty
    #[serde(default, rename = "allowed-anchor")]
    pub allowed_anchor: Vec<AllowedAnchorEntry>,
}

/// Probe behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CheckerConfig {
    /// Verify that URL fragments exist on the fetched page
    pub check_anchor: bool,

    /// Redirect hops allowed per URL
    pub max_redirects: u32,

    /// Retries per hop for transient failures
    pub max_retries: u32,

    /// Timeout for each HTTP attempt (milliseconds)
    pub timeout_ms: u64,

    /// Minimum time between request starts to the same domain (milliseconds)
    pub rate_limit_per_domain_ms: Option<u64>,

    /// Maximum number of URLs probed at once
    pub max_concurrent_checks: usize,

    /// Whether meta refreshes consume the redirect budget
    pub count_refresh_as_redirect: bool,

    /// Unit of the cubic retry backoff (milliseconds)
    pub retry_backoff_unit_ms: u64,

    /// Skip URLs on localhost and loopback addresses
    pub ignore_localhost: bool,

    /// Regular expressions for URLs that are never probed
    pub ignore_urls: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            check_anchor: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: 3000,
            rate_limit_per_domain_ms: None,
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
            count_refresh_as_redirect: false,
            retry_backoff_unit_ms: 1000,
            ignore_localhost: true,
            ignore_urls: Vec::new(),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NetworkConfig {
    /// `User-Agent` header value
    pub user_agent: String,

    /// Reject invalid TLS certificates
    pub verify_tls: bool,

    /// Honour `HTTP(S)_PROXY`, `ALL_PROXY` and `NO_PROXY`
    pub use_env_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_tls: true,
            use_env_proxy: true,
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Path to the SQLite cache file
    pub path: String,

    /// Lifetime of successes and missing-anchor results (seconds)
    pub success_ttl_secs: u64,

    /// Lifetime of every other error (seconds)
    pub error_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: ".link-vigil/cache.db".to_string(),
            success_ttl_secs: 24 * 60 * 60,
            error_ttl_secs: 60,
        }
    }
}

/// One `(url, fragment)` pattern pair
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowedAnchorEntry {
    /// Regex matched against the URL without its fragment
    pub url: String,

    /// Regex matched against the fragment without the leading `#`
    pub fragment: String,
}

impl Config {
    /// Builds the options shared by every probe
    ///
    /// Host patterns are lowercased. Regexes are compiled here, so an
    /// unvalidated config can still fail with `InvalidRegex`.
    pub fn check_options(&self) -> Result<CheckOptions, ConfigError> {
        let checker = &self.checker;

        let patterns = checker
            .ignore_urls
            .iter()
            .map(|p| compile_regex(p))
            .collect::<Result<Vec<_>, _>>()?;

        let anchor_allowlist = if self.allowed_anchor.is_empty() {
            AnchorAllowlist::default_rules()
        } else {
            let pairs: Vec<(&str, &str)> = self
                .allowed_anchor
                .iter()
                .map(|e| (e.url.as_str(), e.fragment.as_str()))
                .collect();
            AnchorAllowlist::from_patterns(&pairs)
                .map_err(|(pattern, source)| ConfigError::InvalidRegex { pattern, source })?
        };

        let allowed_status_codes_by_host = if self.allowed_status_codes.is_empty() {
            None
        } else {
            Some(
                self.allowed_status_codes
                    .iter()
                    .map(|(host, codes)| {
                        (host.to_ascii_lowercase(), codes.iter().copied().collect::<HashSet<_>>())
                    })
                    .collect(),
            )
        };

        Ok(CheckOptions {
            check_anchor: checker.check_anchor,
            max_redirects: checker.max_redirects,
            max_retries: checker.max_retries,
            timeout: Duration::from_millis(checker.timeout_ms),
            rate_limit_per_domain: checker.rate_limit_per_domain_ms.map(Duration::from_millis),
            allowed_status_codes_by_host,
            anchor_allowlist,
            count_refresh_as_redirect: checker.count_refresh_as_redirect,
            retry_backoff_unit: Duration::from_millis(checker.retry_backoff_unit_ms),
            ignore: IgnoreRules {
                ignore_localhost: checker.ignore_localhost,
                patterns,
            },
            max_concurrent_checks: checker.max_concurrent_checks,
        })
    }

    pub fn network_settings(&self) -> NetworkSettings {
        NetworkSettings {
            user_agent: self.network.user_agent.clone(),
            verify_tls: self.network.verify_tls,
            use_env_proxy: self.network.use_env_proxy,
        }
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl {
            success: Duration::from_secs(self.cache.success_ttl_secs),
            error: Duration::from_secs(self.cache.error_ttl_secs),
        }
    }
}
