use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashSet;

/// Characters the `url` crate percent-encodes inside a fragment
const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Checks whether `fragment` is one of `ids`
///
/// With `ignore_case` both sides are lowercased before comparison. Remote
/// pages are always checked with `ignore_case = false`: raw HTML `id`
/// attributes are case-sensitive, unlike generated heading slugs.
///
/// # Examples
///
/// ```
/// use link_vigil::anchor::has_fragment;
///
/// assert!(has_fragment("Intro", ["Intro", "usage"], false));
/// assert!(!has_fragment("intro", ["Intro"], false));
/// assert!(has_fragment("intro", ["Intro"], true));
/// ```
pub fn has_fragment<I, S>(fragment: &str, ids: I, ignore_case: bool) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if ignore_case {
        let wanted = fragment.to_lowercase();
        ids.into_iter()
            .any(|id| id.as_ref().to_lowercase() == wanted)
    } else {
        ids.into_iter().any(|id| id.as_ref() == fragment)
    }
}

/// Builds the set of fragment spellings that reach the given ids
///
/// A URL fragment arrives percent-encoded (`#caf%C3%A9`), while the page
/// carries the raw id (`id="café"`), so each id contributes both forms.
pub fn fragment_targets<I, S>(ids: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut targets = HashSet::new();
    for id in ids {
        let id = id.as_ref();
        let encoded = encode_fragment(id);
        if encoded != id {
            targets.insert(encoded);
        }
        targets.insert(id.to_string());
    }
    targets
}

/// Percent-encodes `value` the way it would appear in a parsed URL fragment
pub fn encode_fragment(value: &str) -> String {
    utf8_percent_encode(value, FRAGMENT).to_string()
}
