use crate::probe::Outcome;
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

const ANCHOR_ENABLED_NAMESPACE: &str = "check-anchor-enable";
const ANCHOR_DISABLED_NAMESPACE: &str = "check-anchor-disable";

/// Content-addressed key for one URL under one anchor-check setting
///
/// The digest covers the scheme, `host:port`, and path plus query plus
/// fragment, inside a namespace chosen by the anchor flag. When anchors are
/// not checked the fragment is left out, so `/a#x` and `/a#y` share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    url: String,
}

impl CacheKey {
    pub fn new(url: &Url, check_anchor: bool) -> Self {
        let namespace = if check_anchor {
            ANCHOR_ENABLED_NAMESPACE
        } else {
            ANCHOR_DISABLED_NAMESPACE
        };
        let host = format!(
            "{}:{}",
            url.host_str().unwrap_or_default(),
            url.port_or_known_default().unwrap_or_default()
        );
        let mut location = url.path().to_string();
        if let Some(query) = url.query() {
            location.push('?');
            location.push_str(query);
        }
        if check_anchor {
            if let Some(fragment) = url.fragment() {
                location.push('#');
                location.push_str(fragment);
            }
        }

        let mut hasher = Sha256::new();
        for part in [namespace, url.scheme(), host.as_str(), location.as_str()] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }

        Self {
            digest: hex::encode(hasher.finalize()),
            url: url.to_string(),
        }
    }

    /// Hex-encoded SHA-256 digest used as the storage key
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The URL the key was built from, kept for diagnostics
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Time-to-live policy for cached outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// Successes, fallbacks and missing anchors
    pub success: Duration,
    /// Every other error
    pub error: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            success: Duration::from_secs(24 * 60 * 60),
            error: Duration::from_secs(60),
        }
    }
}

impl CacheTtl {
    pub fn ttl_for(&self, outcome: &Outcome) -> Duration {
        if outcome.is_long_lived() {
            self.success
        } else {
            self.error
        }
    }
}
