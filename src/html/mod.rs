//! HTML handling for fetched pages
//!
//! The prober never walks a DOM itself. It only needs:
//! - `id` attribute values (anchor targets)
//! - `<meta http-equiv="refresh">` directives and their targets

mod page;
mod refresh;

pub use page::{scan_page, PageSummary};
pub use refresh::{refresh_url_string, resolve_refresh, Refresh};

use url::Url;

/// Resolves the first refresh directive on `page` that names a target
///
/// Directives that are only a reload timer are skipped.
pub fn find_refresh(page: &PageSummary, from: &Url) -> Option<Refresh> {
    page.refreshes
        .iter()
        .find_map(|content| resolve_refresh(content, from))
}
