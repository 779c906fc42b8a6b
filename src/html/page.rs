//! Page scanning for fetched HTML
//!
//! The document is parsed once with `scraper` (html5ever underneath), and only
//! what the prober needs is kept: element ids and refresh directives. The
//! parsed tree is dropped before returning, so the summary is cheap to hold
//! across awaits.

use scraper::{Html, Selector};

/// What the prober needs to know about a fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Every non-empty `id` attribute, in document order
    pub ids: Vec<String>,

    /// `content` of each `<meta http-equiv="refresh">`, in document order
    pub refreshes: Vec<String>,
}

/// Parses `html` and extracts anchor targets and refresh directives
///
/// Ids inside `<script>`, `<style>` and comments are not elements and are
/// never reported.
///
/// # Example
///
/// ```
/// use link_vigil::html::scan_page;
///
/// let page = scan_page(r#"<meta http-equiv="Refresh" content="5"><h2 id="usage">Usage</h2>"#);
/// assert_eq!(page.ids, vec!["usage".to_string()]);
/// assert_eq!(page.refreshes, vec!["5".to_string()]);
/// ```
pub fn scan_page(html: &str) -> PageSummary {
    let document = Html::parse_document(html);
    PageSummary {
        ids: extract_ids(&document),
        refreshes: extract_refreshes(&document),
    }
}

/// Extracts every non-empty `id` attribute
fn extract_ids(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("[id]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("id"))
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Extracts the `content` of refresh meta tags
fn extract_refreshes(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("meta[http-equiv]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|element| element.value().attr("content"))
        .map(String::from)
        .collect()
}
