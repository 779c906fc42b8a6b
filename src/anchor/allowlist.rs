use regex::Regex;
use url::Url;

use crate::url::strip_fragment;

/// Pairs of (URL pattern, fragment pattern) whose fragments are always accepted
///
/// When a URL matches the first pattern and its fragment matches the second,
/// the anchor is treated as present without looking at the page. This covers
/// fragments that no element id will ever carry, such as text fragments
/// (`#:~:text=...`) or line ranges (`#L10-L20`).
///
/// URL patterns are matched against the URL with its fragment removed;
/// fragment patterns against the fragment without the leading `#`.
#[derive(Debug, Clone, Default)]
pub struct AnchorAllowlist {
    entries: Vec<(Regex, Regex)>,
}

impl AnchorAllowlist {
    /// Creates an allow-list that accepts nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles an allow-list from `(url, fragment)` pattern strings
    ///
    /// # Returns
    ///
    /// * `Ok(AnchorAllowlist)` - All patterns compiled
    /// * `Err((pattern, regex::Error))` - The first pattern that failed
    pub fn from_patterns<S: AsRef<str>>(
        patterns: &[(S, S)],
    ) -> Result<Self, (String, regex::Error)> {
        let mut entries = Vec::with_capacity(patterns.len());
        for (url, fragment) in patterns {
            let url_re = compile(url.as_ref())?;
            let fragment_re = compile(fragment.as_ref())?;
            entries.push((url_re, fragment_re));
        }
        Ok(Self { entries })
    }

    /// The built-in rules: text fragments anywhere, GitHub line ranges
    pub fn default_rules() -> Self {
        Self::from_patterns(&DEFAULT_RULES).unwrap_or_default()
    }

    /// Returns true if `fragment` on `url` needs no existence check
    pub fn allows(&self, url: &Url, fragment: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let bare = strip_fragment(url);
        self.entries
            .iter()
            .any(|(url_re, fragment_re)| url_re.is_match(bare.as_str()) && fragment_re.is_match(fragment))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default `(url, fragment)` patterns
pub const DEFAULT_RULES: [(&str, &str); 2] = [
    (".", "^:~:"),
    (
        r"^https://github\.com/",
        r"^L\d+(?:C\d+)?(?:-L\d+(?:C\d+)?)?$",
    ),
];

fn compile(pattern: &str) -> Result<Regex, (String, regex::Error)> {
    Regex::new(pattern).map_err(|e| (pattern.to_string(), e))
}
