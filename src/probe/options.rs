use crate::anchor::AnchorAllowlist;
use crate::url::{matches_wildcard, IgnoreRules};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default number of HTTP redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Default number of retries per hop
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default number of URLs probed concurrently
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 32;

/// Options for one checking invocation
///
/// Built once per invocation and shared read-only by every probe in it.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Verify that URL fragments name an element on the fetched page
    pub check_anchor: bool,

    /// Redirect hops allowed before `max-redirect` is reported
    pub max_redirects: u32,

    /// Retries allowed per hop for transient failures
    pub max_retries: u32,

    /// Hard timeout for each individual HTTP attempt
    pub timeout: Duration,

    /// Minimum interval between request starts to the same domain
    pub rate_limit_per_domain: Option<Duration>,

    /// Non-2xx statuses accepted as success, keyed by host pattern
    pub allowed_status_codes_by_host: Option<HashMap<String, HashSet<u16>>>,

    /// Fragments that bypass the existence check
    pub anchor_allowlist: AnchorAllowlist,

    /// Whether meta-refresh hops consume the redirect budget
    pub count_refresh_as_redirect: bool,

    /// Backoff before retry `n` is `n^3 * retry_backoff_unit`
    pub retry_backoff_unit: Duration,

    /// URLs that are classified `ignored` without probing
    pub ignore: IgnoreRules,

    /// Upper bound on URLs probed at the same time
    pub max_concurrent_checks: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_anchor: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            rate_limit_per_domain: None,
            allowed_status_codes_by_host: None,
            anchor_allowlist: AnchorAllowlist::default_rules(),
            count_refresh_as_redirect: false,
            retry_backoff_unit: Duration::from_secs(1),
            ignore: IgnoreRules::default(),
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }
}

impl CheckOptions {
    /// Delay before the given retry (1-based)
    ///
    /// The backoff grows cubically with no jitter: 1, 8, 27, ... units.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_backoff_unit
            .saturating_mul(retry.saturating_pow(3))
    }

    /// Checks if `status` is explicitly accepted for `host`
    pub fn is_status_allowed(&self, host: &str, status: u16) -> bool {
        self.allowed_status_codes_by_host
            .as_ref()
            .is_some_and(|by_host| {
                by_host
                    .iter()
                    .any(|(pattern, codes)| codes.contains(&status) && matches_wildcard(pattern, host))
            })
    }

    /// The pacing interval, if pacing is enabled
    pub fn pacing_interval(&self) -> Option<Duration> {
        self.rate_limit_per_domain.filter(|d| !d.is_zero())
    }
}
