//! URL handling for Link-Vigil
//!
//! This module provides domain-key extraction, host pattern matching and the
//! classification that decides whether a URL is probed at all.

mod domain;
mod matcher;

use ::url::Url;
use regex::Regex;

pub use domain::{extract_domain, is_localhost, strip_fragment};
pub use matcher::{is_valid_pattern, matches_wildcard};

/// How an input URL string is treated before probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClassification {
    /// An HTTP(S) URL that will be probed
    Checkable(Url),
    /// Not probed and never cached (non-HTTP scheme or matched an ignore rule)
    Ignored,
    /// Looks like an HTTP(S) URL but does not parse
    Invalid(String),
}

/// Rules that exclude otherwise checkable URLs
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Skip URLs on localhost and loopback addresses
    pub ignore_localhost: bool,
    /// Skip URLs matching any of these patterns
    pub patterns: Vec<Regex>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            ignore_localhost: true,
            patterns: Vec::new(),
        }
    }
}

impl IgnoreRules {
    /// Rules that ignore nothing
    pub fn none() -> Self {
        Self {
            ignore_localhost: false,
            patterns: Vec::new(),
        }
    }

    /// Returns true if the URL should be skipped
    pub fn is_ignored(&self, url: &Url) -> bool {
        (self.ignore_localhost && is_localhost(url))
            || self.patterns.iter().any(|re| re.is_match(url.as_str()))
    }
}

/// Classifies a raw URL string
///
/// Anything without an `http:` or `https:` scheme is ignored.
///
/// # Examples
///
/// ```
/// use link_vigil::url::{classify_url, IgnoreRules, UrlClassification};
///
/// let rules = IgnoreRules::default();
/// assert!(matches!(
///     classify_url("https://example.com/", &rules),
///     UrlClassification::Checkable(_)
/// ));
/// assert_eq!(classify_url("mailto:a@b.c", &rules), UrlClassification::Ignored);
/// assert_eq!(classify_url("http://localhost/", &rules), UrlClassification::Ignored);
/// ```
pub fn classify_url(raw: &str, rules: &IgnoreRules) -> UrlClassification {
    let scheme_end = raw.find(':').unwrap_or(0);
    let scheme = raw[..scheme_end].to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return UrlClassification::Ignored;
    }

    match Url::parse(raw) {
        Ok(url) if rules.is_ignored(&url) => UrlClassification::Ignored,
        Ok(url) => UrlClassification::Checkable(url),
        Err(e) => UrlClassification::Invalid(e.to_string()),
    }
}
