//! Substitute URLs for hosts that are unreliable to probe directly
//!
//! Package pages on npm often refuse automated clients, while the registry
//! API behind them answers reliably. When every substitute succeeds the
//! original URL is reported alive.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// `Accept` header the npm registry expects for abbreviated metadata
pub const NPM_ACCEPT: &str = "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

const NPM_REGISTRY: &str = "https://registry.npmjs.org/";

/// A substitute URL plus the headers to send with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackUrl {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FallbackUrl {
    /// Converts the headers for a request, skipping any that are not valid
    pub fn header_map(&self) -> HeaderMap {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
                let value = HeaderValue::from_str(value).ok()?;
                Some((name, value))
            })
            .collect()
    }
}

/// Looks up substitutes for `url`
///
/// An empty list means the URL is probed as is.
///
/// # Examples
///
/// ```
/// use link_vigil::fallback::fallbacks_for;
/// use url::Url;
///
/// let url = Url::parse("https://www.npmtrends.com/react-vs-vue").unwrap();
/// let urls: Vec<_> = fallbacks_for(&url).into_iter().map(|f| f.url).collect();
/// assert_eq!(urls, ["https://registry.npmjs.org/react", "https://registry.npmjs.org/vue"]);
/// ```
pub fn fallbacks_for(url: &Url) -> Vec<FallbackUrl> {
    if !matches!(url.scheme(), "http" | "https") {
        return Vec::new();
    }

    let path = url.path().trim_start_matches('/').trim_end_matches('/');
    match url.host_str() {
        Some("www.npmtrends.com") | Some("npmtrends.com") => {
            if path.is_empty() {
                return Vec::new();
            }
            let names: Vec<&str> = path.split("-vs-").collect();
            if names.iter().any(|name| !is_package_name(name)) {
                return Vec::new();
            }
            names.into_iter().map(npm_registry_fallback).collect()
        }
        Some("www.npmjs.com") | Some("npmjs.com") => {
            let name = path.strip_prefix("package/").unwrap_or(path);
            if is_package_name(name) {
                vec![npm_registry_fallback(name)]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

/// Plain `name` or scoped `@scope/name`
fn is_package_name(name: &str) -> bool {
    match name.strip_prefix('@') {
        Some(scoped) => scoped
            .split_once('/')
            .is_some_and(|(scope, pkg)| !scope.is_empty() && !pkg.is_empty() && !pkg.contains('/')),
        None => !name.is_empty() && !name.contains('/'),
    }
}

fn npm_registry_fallback(name: &str) -> FallbackUrl {
    FallbackUrl {
        url: format!("{}{}", NPM_REGISTRY, name),
        headers: vec![("accept".to_string(), NPM_ACCEPT.to_string())],
    }
}
