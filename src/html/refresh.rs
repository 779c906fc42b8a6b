//! Declarative refresh (`<meta http-equiv="refresh">`) resolution
//!
//! Implements the "shared declarative refresh steps" micro-grammar from the
//! HTML standard: an optional delay, a separator, then an optional `URL=`
//! marker and a possibly quoted URL.

use url::Url;

/// The target named by a refresh directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// A valid URL, resolved against the page it appeared on
    Redirect(Url),
    /// The raw target could not be resolved into a URL
    Malformed { raw: String, from: Url },
}

/// Resolves a refresh `content` attribute against the page URL
///
/// Returns None when the content carries no redirect directive (for example
/// a plain `"30"` reload timer).
///
/// The separator between delay and URL may be `,`, `;` or ASCII whitespace.
/// An empty URL (`"0; url="`) means "reload this page" and yields None.
///
/// # Examples
///
/// ```
/// use link_vigil::html::{resolve_refresh, Refresh};
/// use url::Url;
///
/// let page = Url::parse("https://a.test/x").unwrap();
/// let target = resolve_refresh("0; url=/next", &page);
/// assert_eq!(
///     target,
///     Some(Refresh::Redirect(Url::parse("https://a.test/next").unwrap()))
/// );
/// assert_eq!(resolve_refresh("30", &page), None);
/// ```
pub fn resolve_refresh(content: &str, from: &Url) -> Option<Refresh> {
    let raw = refresh_url_string(content)?;
    if raw.is_empty() {
        return None;
    }

    match from.join(raw) {
        Ok(url) => Some(Refresh::Redirect(url)),
        Err(e) => {
            tracing::debug!("Malformed refresh target '{}' on {}: {}", raw, from, e);
            Some(Refresh::Malformed {
                raw: raw.to_string(),
                from: from.clone(),
            })
        }
    }
}

/// Extracts the raw URL string from a refresh `content` value
pub fn refresh_url_string(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    let mut pos = skip_whitespace(bytes, 0);

    // Delay: at least one digit, or a leading dot.
    let digits_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == digits_start && bytes.get(pos) != Some(&b'.') {
        return None;
    }
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }

    // Separator.
    let after_delay = pos;
    if pos < bytes.len() {
        pos = skip_whitespace(bytes, pos);
        if matches!(bytes.get(pos), Some(b',') | Some(b';')) {
            pos += 1;
        }
        pos = skip_whitespace(bytes, pos);
    }
    if pos == after_delay || pos == bytes.len() {
        return None;
    }

    // Everything from here on is ASCII-checked before advancing, so `pos`
    // always sits on a char boundary.
    let url_string = &input[pos..];

    if !matches!(bytes[pos], b'u' | b'U') {
        return Some(strip_quotes(url_string));
    }
    pos += 1;
    if !matches!(bytes.get(pos), Some(b'r') | Some(b'R')) {
        return Some(url_string);
    }
    pos += 1;
    if !matches!(bytes.get(pos), Some(b'l') | Some(b'L')) {
        return Some(url_string);
    }
    pos += 1;
    pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) != Some(&b'=') {
        return Some(url_string);
    }
    pos += 1;
    pos = skip_whitespace(bytes, pos);

    Some(strip_quotes(&input[pos..]))
}

/// Removes a leading quote and truncates at the matching closing quote
fn strip_quotes(value: &str) -> &str {
    let quote = match value.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return value,
    };
    let inner = &value[1..];
    match inner.find(quote) {
        Some(end) => &inner[..end],
        None => inner,
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ') {
        pos += 1;
    }
    pos
}
