//! SQLite database wrapper with versioned migrations

use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Current schema version
pub(crate) const SCHEMA_VERSION: i32 = 2;

/// Tables holding the five partitions, cleared together by `clear_all`
pub(crate) const PARTITIONS: [&str; 5] = [
    "plans",
    "pending_changes",
    "preferences",
    "drafts",
    "cache_entries",
];

struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

/// Ordered schema migrations; each runs in its own transaction
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial partitions",
        sql: r#"
            -- Saved garden plans, upserted by caller-supplied id
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );

            -- Outbox of local mutations awaiting remote confirmation
            -- AUTOINCREMENT keeps ids strictly increasing and never reused
            CREATE TABLE IF NOT EXISTS pending_changes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                change_type TEXT NOT NULL,
                target_table TEXT NOT NULL,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );

            -- User preferences, last write wins
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- In-progress form state, local only
            CREATE TABLE IF NOT EXISTS drafts (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                saved_at INTEGER NOT NULL
            );

            -- TTL-bound memoized values
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Listing and expiry indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_plans_timestamp
                ON plans(timestamp DESC);

            CREATE INDEX IF NOT EXISTS idx_pending_changes_synced
                ON pending_changes(synced, id);

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires
                ON cache_entries(expires_at);
        "#,
    },
];

/// SQLite database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database described by `config` and migrate it
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db = Self::open_unmigrated(config)?;
        db.run_migrations()?;
        Ok(db)
    }

    /// Create a new database at the given path with default settings
    pub fn new(path: &Path) -> Result<Self> {
        Self::open(&StoreConfig::at(path))
    }

    pub(crate) fn open_unmigrated(config: &StoreConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            let path = config.database_path.as_path();
            // Ensure parent directory exists
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let conn = Connection::open(path)?;
            if config.wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn
        };

        conn.busy_timeout(config.busy_timeout())?;
        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get the current schema version from database
    pub(crate) fn get_schema_version(&self) -> Result<i32> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        let version = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Run all pending migrations
    pub(crate) fn run_migrations(&self) -> Result<()> {
        self.migrate_to(SCHEMA_VERSION)
    }

    /// Apply migrations up to and including `target`
    pub(crate) fn migrate_to(&self, target: i32) -> Result<()> {
        let current_version = self.get_schema_version()?;
        info!(
            "Database schema version: {} (target: {})",
            current_version, target
        );

        if current_version > target {
            warn!(
                "Database schema version {} is newer than this build supports ({}); leaving it as is",
                current_version, target
            );
            return Ok(());
        }
        if current_version == target {
            return Ok(());
        }

        for migration in MIGRATIONS
            .iter()
            .filter(|m| m.version > current_version && m.version <= target)
        {
            info!(
                "Running migration {}: {}",
                migration.version, migration.description
            );
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(migration.sql)?;
            tx.execute(
                "INSERT INTO schema_version (version, description) VALUES (?1, ?2)",
                rusqlite::params![migration.version, migration.description],
            )?;
            tx.commit()?;
        }

        info!("Migrations complete");
        Ok(())
    }

    /// Delete every row from every partition in a single transaction
    ///
    /// Either all partitions end up empty or none are touched. Outbox ids keep
    /// increasing across a clear.
    pub fn clear_all(&self) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StoreError::Clear)?;
        for table in PARTITIONS {
            tx.execute(&format!("DELETE FROM {table}"), [])
                .map_err(StoreError::Clear)?;
        }
        tx.commit().map_err(StoreError::Clear)?;
        tracing::debug!("Cleared all partitions");
        Ok(())
    }
}
