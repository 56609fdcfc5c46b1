//! User preferences storage

use rusqlite::{params, OptionalExtension};

use super::database::Database;
use crate::error::{Result, StoreError};

/// User preferences store
///
/// Values are JSON text; the last write for a key wins.
pub struct PreferenceStore<'a> {
    db: &'a Database,
}

impl<'a> PreferenceStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a preference value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .conn()
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::read("get_preference"))
    }

    /// Set a preference value
    pub fn set(&self, key: &str, value_json: &str, now: i64) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT INTO preferences (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value_json, now],
            )
            .map_err(StoreError::write("save_preference"))?;
        Ok(())
    }

    /// Delete a preference
    pub fn delete(&self, key: &str) -> Result<()> {
        self.db
            .conn()
            .execute("DELETE FROM preferences WHERE key = ?1", [key])
            .map_err(StoreError::write("delete_preference"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::PreferenceStore;
    use crate::storage::Database;

    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path).expect("Failed to create database");
        (db, temp_dir)
    }

    #[test]
    fn test_last_write_wins() {
        let (db, _temp) = create_test_db();
        let prefs = PreferenceStore::new(&db);

        prefs.set("units", r#""imperial""#, 1).unwrap();
        prefs.set("units", r#""metric""#, 2).unwrap();

        assert_eq!(prefs.get("units").unwrap().as_deref(), Some(r#""metric""#));
    }

    #[test]
    fn test_missing_and_deleted_keys() {
        let (db, _temp) = create_test_db();
        let prefs = PreferenceStore::new(&db);

        assert_eq!(prefs.get("theme").unwrap(), None);
        prefs.delete("theme").expect("Deleting a missing key should succeed");

        prefs.set("theme", r#""dark""#, 1).unwrap();
        prefs.delete("theme").unwrap();
        assert_eq!(prefs.get("theme").unwrap(), None);
    }
}
