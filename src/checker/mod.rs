//! Checker - orchestration for a batch of URLs
//!
//! For every distinct input URL the checker:
//! - classifies it (ignored, invalid or checkable)
//! - consults the result cache
//! - tries substitute URLs for known unreliable hosts
//! - probes the URL itself
//! - writes the outcome through to the cache

use crate::cache::{open_cache, CacheKey, ResultCache};
use crate::config::Config;
use crate::fallback::{fallbacks_for, FallbackUrl};
use crate::probe::{build_http_client, CheckOptions, NetworkSettings, Outcome, ProbeError, Prober, UrlStatus};
use crate::url::{classify_url, UrlClassification};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Looks up substitute URLs for a URL
pub type FallbackFn = Arc<dyn Fn(&Url) -> Vec<FallbackUrl> + Send + Sync>;

/// Checks batches of URLs with shared options, client, limiter and cache
pub struct Checker {
    prober: Prober,
    cache: Option<Arc<dyn ResultCache>>,
    fallbacks: FallbackFn,
}

impl Checker {
    /// Creates a checker
    ///
    /// # Arguments
    ///
    /// * `options` - Options shared by every probe
    /// * `client` - HTTP client; must not follow redirects itself
    /// * `cache` - Result cache, or `None` to always probe
    pub fn new(options: CheckOptions, client: Client, cache: Option<Arc<dyn ResultCache>>) -> Self {
        Self {
            prober: Prober::new(client, Arc::new(options)),
            cache,
            fallbacks: Arc::new(fallbacks_for),
        }
    }

    /// Creates a checker from a loaded configuration
    ///
    /// A cache that cannot be opened is logged and disabled rather than
    /// failing the run.
    ///
    /// # Returns
    ///
    /// * `Ok(Checker)` - Ready to check URLs
    /// * `Err(VigilError)` - Invalid options or the HTTP client could not be built
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let options = config.check_options()?;
        let client = build_http_client(&config.network_settings())?;

        let cache: Option<Arc<dyn ResultCache>> = if config.cache.enabled {
            match open_cache(Path::new(&config.cache.path), config.cache_ttl()) {
                Ok(cache) => Some(Arc::new(cache) as Arc<dyn ResultCache>),
                Err(e) => {
                    warn!("Result cache disabled, failed to open {}: {}", config.cache.path, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(options, client, cache))
    }

    /// Replaces the substitute-URL lookup
    pub fn with_fallbacks<F>(mut self, fallbacks: F) -> Self
    where
        F: Fn(&Url) -> Vec<FallbackUrl> + Send + Sync + 'static,
    {
        self.fallbacks = Arc::new(fallbacks);
        self
    }

    pub fn options(&self) -> &CheckOptions {
        self.prober.options()
    }

    /// Checks every URL, returning one status per input entry
    ///
    /// Duplicate inputs are probed once. Up to `max_concurrent_checks` URLs
    /// are in flight at a time.
    pub async fn check_urls(&self, urls: &[String]) -> Vec<UrlStatus> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = urls
            .iter()
            .map(String::as_str)
            .filter(|url| seen.insert(*url))
            .collect();

        info!("Checking {} URLs ({} distinct)", urls.len(), unique.len());

        let limit = self.options().max_concurrent_checks.max(1);
        let outcomes: HashMap<&str, Outcome> = stream::iter(unique)
            .map(|url| async move { (url, self.check_url(url).await) })
            .buffer_unordered(limit)
            .collect()
            .await;

        let statuses: Vec<UrlStatus> = urls
            .iter()
            .filter_map(|url| {
                outcomes.get(url.as_str()).map(|status| UrlStatus {
                    url: url.clone(),
                    status: status.clone(),
                })
            })
            .collect();

        log_summary(&statuses);
        statuses
    }

    /// Checks a single URL
    pub async fn check_url(&self, raw: &str) -> Outcome {
        let options = self.options();
        let mut url = match classify_url(raw, &options.ignore) {
            UrlClassification::Checkable(url) => url,
            UrlClassification::Ignored => {
                debug!("Ignoring {}", raw);
                return Outcome::Ignored;
            }
            UrlClassification::Invalid(reason) => {
                return Outcome::error(
                    raw,
                    ProbeError::Fetch {
                        message: format!("Invalid URL: {}", reason),
                    },
                );
            }
        };

        if !options.check_anchor {
            url.set_fragment(None);
        }

        let key = CacheKey::new(&url, options.check_anchor);
        if let Some(outcome) = self.cached(&key) {
            debug!("Cache hit for {}", url);
            return outcome;
        }

        let outcome = self.resolve(&url).await;
        debug!("{} -> {}", url, outcome.kind());
        self.store(&key, &outcome);
        outcome
    }

    /// Tries substitutes first, then the URL itself
    async fn resolve(&self, url: &Url) -> Outcome {
        let fallbacks = (self.fallbacks)(url);
        if !fallbacks.is_empty() {
            let alive = join_all(fallbacks.iter().map(|f| self.probe_fallback(f))).await;
            if alive.iter().all(|ok| *ok) {
                return Outcome::Fallback {
                    url: url.to_string(),
                    fallbacks: fallbacks.into_iter().map(|f| f.url).collect(),
                };
            }
            debug!("Fallbacks for {} failed, probing it directly", url);
        }

        self.prober.probe(url, None).await
    }

    async fn probe_fallback(&self, fallback: &FallbackUrl) -> bool {
        match Url::parse(&fallback.url) {
            Ok(url) => self
                .prober
                .probe(&url, Some(fallback.header_map()))
                .await
                .is_alive(),
            Err(e) => {
                warn!("Skipping unparsable fallback {}: {}", fallback.url, e);
                false
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<Outcome> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key.url(), e);
                None
            }
        }
    }

    fn store(&self, key: &CacheKey, outcome: &Outcome) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(key, outcome) {
                warn!("Cache write failed for {}: {}", key.url(), e);
            }
        }
    }
}

/// Checks `urls` with default network settings and no cache
///
/// # Example
///
/// ```no_run
/// use link_vigil::{check_urls, CheckOptions};
///
/// # async fn example() -> link_vigil::Result<()> {
/// let urls = vec!["https://example.com/#intro".to_string()];
/// for status in check_urls(&urls, CheckOptions::default()).await? {
///     println!("{} is {}", status.url, status.status.kind());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn check_urls(urls: &[String], options: CheckOptions) -> crate::Result<Vec<UrlStatus>> {
    let client = build_http_client(&NetworkSettings::default())?;
    Ok(Checker::new(options, client, None).check_urls(urls).await)
}

fn log_summary(statuses: &[UrlStatus]) {
    let mut alive = 0;
    let mut dead = 0;
    let mut ignored = 0;
    for status in statuses {
        match &status.status {
            Outcome::Ignored => ignored += 1,
            outcome if outcome.is_alive() => alive += 1,
            _ => dead += 1,
        }
    }
    info!("Checked {} URLs: {} alive, {} dead, {} ignored", statuses.len(), alive, dead, ignored);
}
