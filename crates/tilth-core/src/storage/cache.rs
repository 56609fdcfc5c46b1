//! TTL cache partition
//!
//! Expiry is enforced on two independent paths: a read of an expired entry
//! deletes it and reports a miss, and `sweep` removes every expired entry
//! whether or not it was read. Nothing here runs on a timer.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::database::Database;
use crate::error::{Result, StoreError};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Compute the expiry instant for an entry written at `now`
///
/// A TTL that is zero, negative or not finite expires immediately: the entry
/// is dated one millisecond in the past so the next read misses.
pub fn expires_at(now: i64, ttl_minutes: f64) -> i64 {
    if !ttl_minutes.is_finite() || ttl_minutes <= 0.0 {
        return now.saturating_sub(1);
    }
    let ttl_ms = (ttl_minutes * MILLIS_PER_MINUTE).round();
    // Saturating float-to-int cast keeps absurd TTLs from overflowing
    now.saturating_add(ttl_ms as i64)
}

/// Cache store
pub struct CacheStore<'a> {
    db: &'a Database,
}

impl<'a> CacheStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a value until `expires_at`, replacing any previous entry
    pub fn put(&self, key: &str, data_json: &str, expires_at: i64) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, data, expires_at) VALUES (?1, ?2, ?3)",
                params![key, data_json, expires_at],
            )
            .map_err(StoreError::write("cache_data"))?;
        Ok(())
    }

    /// Read a live entry, evicting it if it expired before `now`
    pub fn get(&self, key: &str, now: i64) -> Result<Option<String>> {
        let tx = self
            .db
            .conn()
            .unchecked_transaction()
            .map_err(StoreError::write("get_cached_data"))?;

        let entry: Option<(String, i64)> = tx
            .query_row(
                "SELECT data, expires_at FROM cache_entries WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(StoreError::read("get_cached_data"))?;

        let value = match entry {
            Some((_, expires_at)) if now > expires_at => {
                tx.execute("DELETE FROM cache_entries WHERE key = ?1", [key])
                    .map_err(StoreError::write("get_cached_data"))?;
                debug!(key, expires_at, "Cache entry expired, evicted on read");
                None
            }
            Some((data, _)) => Some(data),
            None => None,
        };

        tx.commit().map_err(StoreError::write("get_cached_data"))?;
        Ok(value)
    }

    /// Delete every entry that expired before `now`; returns how many
    pub fn sweep(&self, now: i64) -> Result<usize> {
        let removed = self
            .db
            .conn()
            .execute("DELETE FROM cache_entries WHERE expires_at < ?1", [now])
            .map_err(StoreError::write("cleanup_cache"))?;
        debug!(removed, "Cache sweep complete");
        Ok(removed)
    }

    /// Number of stored entries, live or expired
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(StoreError::read("cache_len"))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
