use url::Url;

/// Extracts the domain key from a URL
///
/// The domain key is the lowercase host without the port. It groups requests
/// for rate limiting and selects per-host allowed status codes.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use link_vigil::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL points at the local machine
///
/// Matches `localhost`, `127.0.0.1`, `0.0.0.0` and `[::1]`, on any port.
pub fn is_localhost(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0") | Some("[::1]")
    )
}

/// Returns a copy of `url` without its fragment
pub fn strip_fragment(url: &Url) -> Url {
    let mut bare = url.clone();
    bare.set_fragment(None);
    bare
}
