//! Probing: options, outcomes, HTTP client and the prober itself

mod client;
mod options;
mod outcome;
mod prober;

pub use client::{build_http_client, proxies_from_env, NetworkSettings, ProxyScope, ProxySpec, DEFAULT_USER_AGENT};
pub use options::{
    CheckOptions, DEFAULT_MAX_CONCURRENT_CHECKS, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
};
pub use outcome::{Outcome, ProbeError, UrlStatus};
pub use prober::{is_html, is_retryable_status, redirect_target, Prober, HTML_ACCEPT};
