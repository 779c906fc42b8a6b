//! Persistent result cache
//!
//! Outcomes are stored under a content-addressed key with an asymmetric
//! lifetime: results whose fetch succeeded live for a day, other errors for a
//! minute. Entries written by a different build version are ignored.

mod key;
mod schema;
mod sqlite;
mod traits;

pub use key::{CacheKey, CacheTtl};
pub use sqlite::{SqliteCache, FORMAT_VERSION};
pub use traits::{CacheError, CacheResult, ResultCache};

use std::path::Path;

/// Opens the on-disk cache at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `ttl` - Lifetimes for newly written entries
pub fn open_cache(path: &Path, ttl: CacheTtl) -> CacheResult<SqliteCache> {
    SqliteCache::open(path, ttl)
}
