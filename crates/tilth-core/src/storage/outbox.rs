//! Pending-change outbox
//!
//! Every local mutation destined for the remote backend is recorded here
//! before any network attempt. Entries come back in insertion order and are
//! never modified except for the `synced` flag.

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::error::{Result, StoreError};

/// Outbox entry identifier, assigned by the store
pub type ChangeId = i64;

/// Kind of mutation a pending change replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ChangeKind::Create),
            "update" => Some(ChangeKind::Update),
            "delete" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbox entry as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub id: ChangeId,
    pub kind: ChangeKind,
    /// Remote collection the change targets
    pub table: String,
    pub data_json: String,
    pub timestamp: i64,
    pub synced: bool,
}

/// Outbox store
pub struct ChangeQueue<'a> {
    db: &'a Database,
}

impl<'a> ChangeQueue<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a change and return it with its assigned id
    pub fn push(
        &self,
        kind: ChangeKind,
        table: &str,
        data_json: &str,
        timestamp: i64,
    ) -> Result<ChangeRow> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO pending_changes (change_type, target_table, data, timestamp, synced)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![kind.as_str(), table, data_json, timestamp],
        )
        .map_err(StoreError::write("add_pending_change"))?;

        Ok(ChangeRow {
            id: conn.last_insert_rowid(),
            kind,
            table: table.to_string(),
            data_json: data_json.to_string(),
            timestamp,
            synced: false,
        })
    }

    /// All recorded changes, synced or not, in insertion order
    pub fn list_all(&self) -> Result<Vec<ChangeRow>> {
        self.query(
            "get_pending_changes",
            "SELECT id, change_type, target_table, data, timestamp, synced
             FROM pending_changes ORDER BY id",
        )
    }

    /// Changes still awaiting remote confirmation, in insertion order
    pub fn list_unsynced(&self) -> Result<Vec<ChangeRow>> {
        self.query(
            "get_unsynced_changes",
            "SELECT id, change_type, target_table, data, timestamp, synced
             FROM pending_changes WHERE synced = 0 ORDER BY id",
        )
    }

    /// Acknowledge a change. Idempotent: already-synced and unknown ids succeed
    pub fn mark_synced(&self, id: ChangeId) -> Result<bool> {
        let updated = self
            .db
            .conn()
            .execute(
                "UPDATE pending_changes SET synced = 1 WHERE id = ?1 AND synced = 0",
                [id],
            )
            .map_err(StoreError::write("mark_change_as_synced"))?;
        Ok(updated > 0)
    }

    /// Remove acknowledged changes; unsynced entries are kept
    pub fn purge_synced(&self) -> Result<usize> {
        self.db
            .conn()
            .execute("DELETE FROM pending_changes WHERE synced = 1", [])
            .map_err(StoreError::write("purge_synced_changes"))
    }

    fn query(&self, op: &'static str, sql: &str) -> Result<Vec<ChangeRow>> {
        let mut stmt = self.db.conn().prepare(sql).map_err(StoreError::read(op))?;
        let raw = stmt
            .query_map([], Self::map_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::read(op))?;

        raw.into_iter()
            .map(|(kind, row)| {
                let kind = ChangeKind::parse(&kind).ok_or_else(|| StoreError::Corrupt {
                    op,
                    detail: format!("change {} has unknown type '{}'", row.id, kind),
                })?;
                Ok(ChangeRow { kind, ..row })
            })
            .collect()
    }

    /// Map a row, leaving the kind unparsed so a bad value surfaces as `Corrupt`
    fn map_row(row: &Row) -> rusqlite::Result<(String, ChangeRow)> {
        Ok((
            row.get(1)?,
            ChangeRow {
                id: row.get(0)?,
                kind: ChangeKind::Create,
                table: row.get(2)?,
                data_json: row.get(3)?,
                timestamp: row.get(4)?,
                synced: row.get(5)?,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{ChangeKind, ChangeQueue};
    use crate::error::StoreError;
    use crate::storage::Database;

    /// Helper to create a temporary database for testing
    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path).expect("Failed to create database");
        (db, temp_dir)
    }

    #[test]
    fn test_push_assigns_increasing_ids() {
        let (db, _temp) = create_test_db();
        let queue = ChangeQueue::new(&db);

        let a = queue.push(ChangeKind::Create, "plans", r#"{"id":"a"}"#, 10).unwrap();
        let b = queue.push(ChangeKind::Update, "plans", r#"{"id":"a"}"#, 10).unwrap();
        let c = queue.push(ChangeKind::Delete, "plans", r#"{"id":"a"}"#, 5).unwrap();
        assert!(a.id < b.id && b.id < c.id);
        assert!(!a.synced);

        // Ordered by insertion, not by timestamp
        let kinds: Vec<ChangeKind> = queue.list_all().unwrap().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[test]
    fn test_mark_synced_is_idempotent() {
        let (db, _temp) = create_test_db();
        let queue = ChangeQueue::new(&db);

        let change = queue.push(ChangeKind::Create, "plans", "{}", 1).unwrap();
        assert!(queue.mark_synced(change.id).unwrap());
        assert!(!queue.mark_synced(change.id).unwrap());
        assert!(!queue.mark_synced(9_999).unwrap());

        let all = queue.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].synced);
        assert!(queue.list_unsynced().unwrap().is_empty());
    }

    #[test]
    fn test_purge_keeps_unsynced() {
        let (db, _temp) = create_test_db();
        let queue = ChangeQueue::new(&db);

        let first = queue.push(ChangeKind::Create, "beds", "{}", 1).unwrap();
        let second = queue.push(ChangeKind::Update, "beds", "{}", 2).unwrap();
        queue.mark_synced(first.id).unwrap();

        assert_eq!(queue.purge_synced().unwrap(), 1);
        let remaining = queue.list_all().unwrap();
        assert_eq!(remaining, vec![second]);
    }

    #[test]
    fn test_ids_not_reused_after_purge() {
        let (db, _temp) = create_test_db();
        let queue = ChangeQueue::new(&db);

        let first = queue.push(ChangeKind::Create, "plans", "{}", 1).unwrap();
        queue.mark_synced(first.id).unwrap();
        queue.purge_synced().unwrap();

        let next = queue.push(ChangeKind::Create, "plans", "{}", 2).unwrap();
        assert!(next.id > first.id);
    }

    #[test]
    fn test_unknown_kind_is_corrupt() {
        let (db, _temp) = create_test_db();
        db.conn()
            .execute(
                "INSERT INTO pending_changes (change_type, target_table, data, timestamp)
                 VALUES ('upsert', 'plans', '{}', 1)",
                [],
            )
            .expect("Failed to insert row");

        let err = ChangeQueue::new(&db).list_all().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete] {
            assert_eq!(ChangeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeKind::parse("CREATE"), None);
    }
}
