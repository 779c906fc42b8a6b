//! Anchor (fragment) validation for fetched pages
//!
//! The matcher is a pure membership test; the allow-list decides which
//! fragments bypass the test entirely. Callers consult the allow-list first.

mod allowlist;
mod matcher;

pub use allowlist::{AnchorAllowlist, DEFAULT_RULES};
pub use matcher::{encode_fragment, fragment_targets, has_fragment};
