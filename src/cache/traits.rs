//! Cache trait and error types

use super::key::CacheKey;
use crate::probe::Outcome;
use thiserror::Error;

/// Errors that can occur during cache operations
///
/// Callers treat these as a miss; a broken cache never fails a check.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A store of previously computed outcomes
///
/// Implementations must be safe for concurrent access from many probes.
/// Writes for the same key are last-write-wins.
pub trait ResultCache: Send + Sync {
    /// Returns the stored outcome if it is still usable
    fn get(&self, key: &CacheKey) -> CacheResult<Option<Outcome>>;

    /// Stores an outcome; `ignored` outcomes are never stored
    fn put(&self, key: &CacheKey, outcome: &Outcome) -> CacheResult<()>;
}
