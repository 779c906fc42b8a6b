//! Resource status prober
//!
//! One probe resolves one URL through redirects, meta refreshes and retries
//! until it reaches a terminal [`Outcome`]. Hops are strictly sequential and
//! every hop is sent through the domain rate limiter when pacing is enabled.

use super::options::CheckOptions;
use super::outcome::{Outcome, ProbeError};
use crate::anchor::{fragment_targets, has_fragment};
use crate::html::{find_refresh, scan_page, Refresh};
use crate::limiter::DomainRateLimiter;
use crate::state::ProbeState;
use crate::url::extract_domain;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// `Accept` header sent on every hop unless overridden
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Probes URLs with a shared client, options and limiter
#[derive(Clone)]
pub struct Prober {
    client: Client,
    options: Arc<CheckOptions>,
    limiter: Option<DomainRateLimiter>,
}

/// What a single hop produced before interpretation
enum Hop {
    Response(Response),
    Failed(String),
}

impl Prober {
    /// Creates a prober; a limiter is created when the options ask for pacing
    pub fn new(client: Client, options: Arc<CheckOptions>) -> Self {
        let limiter = options.pacing_interval().map(DomainRateLimiter::new);
        Self {
            client,
            options,
            limiter,
        }
    }

    /// Replaces the limiter, e.g. to share one across probers
    pub fn with_limiter(mut self, limiter: DomainRateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Resolves `url` to a terminal outcome
    ///
    /// `extra_headers` apply to the first URL only, including its retries.
    /// Redirect and refresh targets are requested with default headers.
    pub async fn probe(&self, url: &Url, extra_headers: Option<HeaderMap>) -> Outcome {
        let options = &*self.options;
        let mut state = ProbeState::new();
        let mut current = url.clone();
        let mut headers = extra_headers;

        loop {
            if let Some(redirects) = state.exceeded(options.max_redirects) {
                return Outcome::error(
                    current.as_str(),
                    ProbeError::MaxRedirect {
                        redirects,
                        max_redirects: options.max_redirects,
                    },
                );
            }

            debug!("Probing {} ({:?})", current, state);

            let response = match self.send(&current, headers.as_ref()).await {
                Hop::Response(response) => response,
                Hop::Failed(message) => {
                    if self.wait_for_retry(&mut state, &current, &message).await {
                        continue;
                    }
                    return Outcome::error(current.as_str(), ProbeError::Fetch { message });
                }
            };

            let status = response.status();

            if status.is_redirection() {
                if let Some(next) = redirect_target(response.headers().get(LOCATION), &current) {
                    debug!("{} redirected ({}) to {}", current, status, next);
                    state.record_redirect();
                    headers = None;
                    current = next;
                    continue;
                }
            }

            if !status.is_success() {
                let code = status.as_u16();
                let allowed = extract_domain(&current)
                    .is_some_and(|host| options.is_status_allowed(&host, code));
                if allowed {
                    debug!("{} returned allowed status {}", current, code);
                    return Outcome::success(current.as_str());
                }
                if is_retryable_status(code)
                    && self
                        .wait_for_retry(&mut state, &current, &format!("status {}", code))
                        .await
                {
                    continue;
                }
                return Outcome::error(current.as_str(), ProbeError::Response { status: code });
            }

            if !is_html(response.headers()) {
                return Outcome::success(current.as_str());
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    let message = describe_error(&e);
                    if self.wait_for_retry(&mut state, &current, &message).await {
                        continue;
                    }
                    return Outcome::error(current.as_str(), ProbeError::Fetch { message });
                }
            };

            let page = scan_page(&body);
            match find_refresh(&page, &current) {
                Some(Refresh::Redirect(next)) => {
                    debug!("{} refreshes to {}", current, next);
                    state.record_refresh(options.count_refresh_as_redirect);
                    headers = None;
                    current = next;
                    continue;
                }
                Some(Refresh::Malformed { raw, from }) => {
                    return Outcome::error(
                        from.as_str(),
                        ProbeError::SharedDeclarativeRefresh {
                            url: raw,
                            from: from.to_string(),
                        },
                    );
                }
                None => {}
            }

            if let Some(fragment) = self.pending_anchor(&current) {
                let targets = fragment_targets(&page.ids);
                if !has_fragment(fragment, &targets, false) {
                    return Outcome::error(
                        current.as_str(),
                        ProbeError::MissingAnchor {
                            url: current.to_string(),
                            fragment: fragment.to_string(),
                        },
                    );
                }
            }

            return Outcome::success(current.as_str());
        }
    }

    /// The fragment that still has to be found on the page, if any
    fn pending_anchor<'u>(&self, url: &'u Url) -> Option<&'u str> {
        let fragment = url.fragment().filter(|f| !f.is_empty())?;
        if !self.options.check_anchor || self.options.anchor_allowlist.allows(url, fragment) {
            return None;
        }
        Some(fragment)
    }

    /// Sleeps for the backoff and returns true if a retry is allowed
    async fn wait_for_retry(&self, state: &mut ProbeState, url: &Url, reason: &str) -> bool {
        if !state.can_retry(self.options.max_retries) {
            return false;
        }
        let retry = state.record_retry();
        let delay = self.options.backoff(retry);
        debug!(
            "Retrying {} ({}/{}) in {:?}: {}",
            url, retry, self.options.max_retries, delay, reason
        );
        tokio::time::sleep(delay).await;
        true
    }

    /// Sends one GET, through the limiter when pacing is enabled
    async fn send(&self, url: &Url, headers: Option<&HeaderMap>) -> Hop {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, HTML_ACCEPT)
            .timeout(self.options.timeout);
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }

        let result = match (&self.limiter, extract_domain(url)) {
            (Some(limiter), Some(domain)) => {
                match limiter.execute(&domain, move || request.send()).await {
                    Ok(result) => result,
                    Err(e) => return Hop::Failed(e.to_string()),
                }
            }
            _ => request.send().await,
        };

        match result {
            Ok(response) => Hop::Response(response),
            Err(e) => Hop::Failed(describe_error(&e)),
        }
    }
}

/// Statuses below 400 or at 500 and above may be transient
pub fn is_retryable_status(status: u16) -> bool {
    status < 400 || status >= 500
}

/// Returns true if the response declares an HTML body
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
}

/// Resolves a `Location` header against the current URL
///
/// A target without a fragment inherits the current one.
pub fn redirect_target(location: Option<&HeaderValue>, current: &Url) -> Option<Url> {
    let location = location?.to_str().ok()?;
    let mut next = current.join(location).ok()?;
    if next.fragment().is_none() {
        next.set_fragment(current.fragment());
    }
    Some(next)
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
