//! SQLite result cache
//!
//! Entries are JSON-encoded outcomes with an absolute expiry in milliseconds
//! and the format version of the build that wrote them.

use super::key::{CacheKey, CacheTtl};
use super::schema::initialize_schema;
use super::traits::{CacheResult, ResultCache};
use crate::probe::Outcome;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Version stamp written with every entry by default
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SQLite cache backend
pub struct SqliteCache {
    conn: Mutex<Connection>,
    ttl: CacheTtl,
    format_version: String,
}

impl SqliteCache {
    /// Opens or creates a cache database at `path`
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `ttl` - Lifetimes for newly written entries
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCache)` - Successfully opened/created database
    /// * `Err(CacheError)` - Failed to open database
    pub fn open(path: &Path, ttl: CacheTtl) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn, ttl))
    }

    /// Creates an in-memory cache that lives as long as the value
    pub fn open_in_memory(ttl: CacheTtl) -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn, ttl))
    }

    fn from_connection(conn: Connection, ttl: CacheTtl) -> Self {
        Self {
            conn: Mutex::new(conn),
            ttl,
            format_version: FORMAT_VERSION.to_string(),
        }
    }

    /// Overrides the version stamp used for reads and writes
    pub fn with_format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Reads `key` as of `now`
    ///
    /// Expired rows, rows from another format version and rows that fail to
    /// decode all read as absent.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<Outcome>> {
        let conn = self.lock();
        let row: Option<(String, i64, String)> = conn
            .query_row(
                "SELECT outcome, expires_at, format_version FROM outcomes WHERE key = ?1",
                params![key.digest()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((outcome, expires_at, version)) = row else {
            return Ok(None);
        };

        if expires_at <= now.timestamp_millis() || version != self.format_version {
            return Ok(None);
        }

        match serde_json::from_str(&outcome) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry for {}: {}", key.url(), e);
                Ok(None)
            }
        }
    }

    /// Writes `outcome` for `key` as of `now`
    pub fn put_at(&self, key: &CacheKey, outcome: &Outcome, now: DateTime<Utc>) -> CacheResult<()> {
        if !outcome.is_cacheable() {
            return Ok(());
        }

        let ttl_ms = i64::try_from(self.ttl.ttl_for(outcome).as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp_millis().saturating_add(ttl_ms);
        let encoded = serde_json::to_string(outcome)?;

        self.lock().execute(
            "INSERT OR REPLACE INTO outcomes (key, url, outcome, expires_at, format_version, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.digest(),
                key.url(),
                encoded,
                expires_at,
                self.format_version,
                now.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Deletes expired and version-mismatched rows, returning how many went
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let removed = self.lock().execute(
            "DELETE FROM outcomes WHERE expires_at <= ?1 OR format_version != ?2",
            params![now.timestamp_millis(), self.format_version],
        )?;
        Ok(removed)
    }

    pub fn purge_expired(&self) -> CacheResult<usize> {
        self.purge_expired_at(Utc::now())
    }

    /// Number of stored rows, usable or not
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM outcomes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultCache for SqliteCache {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<Outcome>> {
        self.get_at(key, Utc::now())
    }

    fn put(&self, key: &CacheKey, outcome: &Outcome) -> CacheResult<()> {
        self.put_at(key, outcome, Utc::now())
    }
}
