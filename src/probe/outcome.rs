use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a probe failed
///
/// These are values, not faults: every failure for a single URL ends up in an
/// [`Outcome::Error`] rather than propagating to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProbeError {
    /// Transport failure or timeout after retries were exhausted
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    /// Non-2xx status that was not retryable or ran out of retries
    #[error("Unexpected status {status}")]
    Response { status: u16 },

    /// The hop ceiling was exceeded
    #[error("Followed {redirects} redirects, more than the maximum of {max_redirects}")]
    MaxRedirect { redirects: u32, max_redirects: u32 },

    /// A meta-refresh target that could not be resolved
    #[error("Malformed refresh target {url:?} on {from}")]
    SharedDeclarativeRefresh { url: String, from: String },

    /// The page loaded but has no element with the requested id
    #[error("Anchor #{fragment} not found on {url}")]
    MissingAnchor { url: String, fragment: String },
}

impl ProbeError {
    /// Short machine-readable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Fetch { .. } => "fetch",
            ProbeError::Response { .. } => "response",
            ProbeError::MaxRedirect { .. } => "maxRedirect",
            ProbeError::SharedDeclarativeRefresh { .. } => "sharedDeclarativeRefresh",
            ProbeError::MissingAnchor { .. } => "missingAnchor",
        }
    }
}

/// Result of checking one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outcome {
    /// The resource is alive; `url` is where resolution ended
    Success { url: String },

    /// Every substitute URL succeeded, so the original counts as alive
    Fallback { url: String, fallbacks: Vec<String> },

    /// The resource is dead or unreachable; `url` is the hop that failed
    Error { url: String, error: ProbeError },

    /// Not probed at all (non-HTTP scheme or an ignore rule)
    Ignored,
}

impl Outcome {
    pub fn success(url: impl Into<String>) -> Self {
        Outcome::Success { url: url.into() }
    }

    pub fn error(url: impl Into<String>, error: ProbeError) -> Self {
        Outcome::Error {
            url: url.into(),
            error,
        }
    }

    /// Returns false only for errors
    pub fn is_alive(&self) -> bool {
        !matches!(self, Outcome::Error { .. })
    }

    /// Name used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Fallback { .. } => "fallback",
            Outcome::Error { error, .. } => error.kind(),
            Outcome::Ignored => "ignored",
        }
    }

    /// Outcomes whose fetch itself succeeded stay valid for a long time
    pub fn is_long_lived(&self) -> bool {
        matches!(
            self,
            Outcome::Success { .. }
                | Outcome::Fallback { .. }
                | Outcome::Error {
                    error: ProbeError::MissingAnchor { .. },
                    ..
                }
        )
    }

    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Outcome::Ignored)
    }
}

/// One requested URL paired with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlStatus {
    /// The URL exactly as the caller supplied it
    pub url: String,
    pub status: Outcome,
}
