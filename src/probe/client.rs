//! HTTP client construction
//!
//! Redirects are never followed by the transport; the prober counts them
//! itself. TLS verification and proxies are taken from [`NetworkSettings`].

use percent_encoding::percent_decode_str;
use reqwest::{redirect::Policy, Client, NoProxy, Proxy};
use std::time::Duration;
use url::Url;

/// Default `User-Agent` header value
pub const DEFAULT_USER_AGENT: &str = concat!("link-vigil/", env!("CARGO_PKG_VERSION"));

/// Transport settings shared by every request of one invocation
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub user_agent: String,

    /// When false, invalid certificates are accepted
    pub verify_tls: bool,

    /// Route requests through `HTTP(S)_PROXY` / `ALL_PROXY`, honouring `NO_PROXY`
    pub use_env_proxy: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_tls: true,
            use_env_proxy: true,
        }
    }
}

/// Which requests a proxy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScope {
    Http,
    Https,
    All,
}

/// A proxy read from the environment, credentials split out of the URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    pub scope: ProxyScope,
    /// Proxy URL with any userinfo removed
    pub url: Url,
    /// Percent-decoded `(username, password)` from the proxy URL
    pub credentials: Option<(String, String)>,
}

/// Builds the HTTP client used for probing
///
/// # Arguments
///
/// * `settings` - User agent, TLS and proxy settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use link_vigil::probe::{build_http_client, NetworkSettings};
///
/// let client = build_http_client(&NetworkSettings::default()).unwrap();
/// ```
pub fn build_http_client(settings: &NetworkSettings) -> Result<Client, reqwest::Error> {
    build_client_with_env(settings, |key| std::env::var(key).ok())
}

fn build_client_with_env<F>(settings: &NetworkSettings, lookup: F) -> Result<Client, reqwest::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .danger_accept_invalid_certs(!settings.verify_tls)
        .gzip(true)
        .brotli(true);

    if settings.use_env_proxy {
        for spec in proxies_from_env(lookup) {
            tracing::debug!("Using {:?} proxy {}", spec.scope, spec.url);
            builder = builder.proxy(build_proxy(spec)?);
        }
    } else {
        builder = builder.no_proxy();
    }

    builder.build()
}

/// Reads proxy settings through `lookup`
///
/// Upper-case variables win over lower-case ones. Unparsable values and
/// proxies that do not speak HTTP (`socks5://` and the like) are skipped with
/// a warning.
pub fn proxies_from_env<F>(lookup: F) -> Vec<ProxySpec>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = [
        (ProxyScope::Https, "HTTPS_PROXY", "https_proxy"),
        (ProxyScope::Http, "HTTP_PROXY", "http_proxy"),
        (ProxyScope::All, "ALL_PROXY", "all_proxy"),
    ];

    vars.iter()
        .filter_map(|(scope, upper, lower)| {
            let raw = lookup(upper)
                .or_else(|| lookup(lower))
                .filter(|v| !v.trim().is_empty())?;
            match parse_proxy(*scope, raw.trim()) {
                Some(spec) if matches!(spec.url.scheme(), "http" | "https") => Some(spec),
                Some(spec) => {
                    tracing::warn!(
                        "Ignoring {} proxy {}: only http and https proxies are supported",
                        upper,
                        spec.url
                    );
                    None
                }
                None => {
                    tracing::warn!("Ignoring unparsable proxy setting {}={}", upper, raw);
                    None
                }
            }
        })
        .collect()
}

fn parse_proxy(scope: ProxyScope, raw: &str) -> Option<ProxySpec> {
    let mut url = Url::parse(raw).ok()?;
    let credentials = if url.username().is_empty() {
        None
    } else {
        let user = percent_decode_str(url.username()).decode_utf8_lossy().into_owned();
        let pass = url
            .password()
            .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
            .unwrap_or_default();
        Some((user, pass))
    };
    url.set_username("").ok()?;
    url.set_password(None).ok()?;
    Some(ProxySpec {
        scope,
        url,
        credentials,
    })
}

fn build_proxy(spec: ProxySpec) -> Result<Proxy, reqwest::Error> {
    let proxy = match spec.scope {
        ProxyScope::Http => Proxy::http(spec.url.as_str())?,
        ProxyScope::Https => Proxy::https(spec.url.as_str())?,
        ProxyScope::All => Proxy::all(spec.url.as_str())?,
    };
    let proxy = proxy.no_proxy(NoProxy::from_env());
    Ok(match spec.credentials {
        Some((user, pass)) => proxy.basic_auth(&user, &pass),
        None => proxy,
    })
}
