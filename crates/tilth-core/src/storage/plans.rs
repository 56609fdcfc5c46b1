//! Plan partition
//!
//! Saved garden designs keyed by a caller-supplied id. The design payload is
//! stored as JSON text and never inspected.

use rusqlite::{params, OptionalExtension, Row};

use super::database::Database;
use crate::error::{Result, StoreError};

/// A plan as stored, with its payload still encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub id: String,
    pub name: String,
    pub data_json: String,
    /// Last write time, epoch milliseconds
    pub timestamp: i64,
    pub synced: bool,
}

/// Plan store
pub struct PlanStore<'a> {
    db: &'a Database,
}

impl<'a> PlanStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert or overwrite the plan with `row.id`
    pub fn upsert(&self, row: &PlanRow) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT INTO plans (id, name, data, timestamp, synced)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    data = excluded.data,
                    timestamp = excluded.timestamp,
                    synced = excluded.synced",
                params![row.id, row.name, row.data_json, row.timestamp, row.synced],
            )
            .map_err(StoreError::write("save_plan"))?;
        Ok(())
    }

    /// Get a plan by id
    pub fn get(&self, id: &str) -> Result<Option<PlanRow>> {
        self.db
            .conn()
            .query_row(
                "SELECT id, name, data, timestamp, synced FROM plans WHERE id = ?1",
                [id],
                Self::map_row,
            )
            .optional()
            .map_err(StoreError::read("get_plan"))
    }

    /// List all plans, most recently written first
    pub fn list(&self) -> Result<Vec<PlanRow>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(
                "SELECT id, name, data, timestamp, synced FROM plans
                 ORDER BY timestamp DESC, id ASC",
            )
            .map_err(StoreError::read("get_all_plans"))?;

        let plans = stmt
            .query_map([], Self::map_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::read("get_all_plans"))?;
        Ok(plans)
    }

    /// Flag a plan as accepted by the remote backend; unknown ids are ignored
    pub fn mark_synced(&self, id: &str) -> Result<bool> {
        let updated = self
            .db
            .conn()
            .execute("UPDATE plans SET synced = 1 WHERE id = ?1", [id])
            .map_err(StoreError::write("mark_plan_synced"))?;
        Ok(updated > 0)
    }

    /// Delete a plan; returns whether a row was removed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self
            .db
            .conn()
            .execute("DELETE FROM plans WHERE id = ?1", [id])
            .map_err(StoreError::write("delete_plan"))?;
        Ok(deleted > 0)
    }

    fn map_row(row: &Row) -> rusqlite::Result<PlanRow> {
        Ok(PlanRow {
            id: row.get(0)?,
            name: row.get(1)?,
            data_json: row.get(2)?,
            timestamp: row.get(3)?,
            synced: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{PlanRow, PlanStore};
    use crate::storage::Database;

    /// Helper to create a temporary database for testing
    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path).expect("Failed to create database");
        (db, temp_dir)
    }

    fn plan(id: &str, timestamp: i64) -> PlanRow {
        PlanRow {
            id: id.to_string(),
            name: format!("Garden {id}"),
            data_json: r#"{"beds":[]}"#.to_string(),
            timestamp,
            synced: false,
        }
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let (db, _temp) = create_test_db();
        let store = PlanStore::new(&db);

        store.upsert(&plan("p1", 100)).expect("Failed to save plan");
        let mut updated = plan("p1", 200);
        updated.name = "Renamed".to_string();
        updated.synced = true;
        store.upsert(&updated).expect("Failed to save plan");

        let plans = store.list().expect("Failed to list plans");
        assert_eq!(plans, vec![updated]);
    }

    #[test]
    fn test_list_orders_most_recent_first() {
        let (db, _temp) = create_test_db();
        let store = PlanStore::new(&db);

        store.upsert(&plan("old", 100)).unwrap();
        store.upsert(&plan("new", 300)).unwrap();
        store.upsert(&plan("b-mid", 200)).unwrap();
        store.upsert(&plan("a-mid", 200)).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["new", "a-mid", "b-mid", "old"]);
    }

    #[test]
    fn test_get_and_delete_unknown_id() {
        let (db, _temp) = create_test_db();
        let store = PlanStore::new(&db);

        assert_eq!(store.get("missing").unwrap(), None);
        assert!(!store.delete("missing").unwrap());
        assert!(!store.mark_synced("missing").unwrap());
    }

    #[test]
    fn test_mark_synced_keeps_timestamp() {
        let (db, _temp) = create_test_db();
        let store = PlanStore::new(&db);

        store.upsert(&plan("p1", 100)).unwrap();
        assert!(store.mark_synced("p1").unwrap());

        let stored = store.get("p1").unwrap().expect("plan should exist");
        assert!(stored.synced);
        assert_eq!(stored.timestamp, 100);

        assert!(store.delete("p1").unwrap());
        assert_eq!(store.get("p1").unwrap(), None);
    }
}
