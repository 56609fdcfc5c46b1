//! Draft storage
//!
//! Keyed in-progress form state (wizard sessions). Drafts never sync and are
//! never expired here; the owning form deletes its draft on completion or
//! cancellation.

use rusqlite::{params, OptionalExtension};

use super::database::Database;
use crate::error::{Result, StoreError};

/// A draft as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRow {
    pub id: String,
    pub data_json: String,
    /// When the draft was last saved, epoch milliseconds
    pub saved_at: i64,
}

/// Draft store
pub struct DraftStore<'a> {
    db: &'a Database,
}

impl<'a> DraftStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Save (or replace) a draft
    pub fn save(&self, id: &str, data_json: &str, now: i64) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT OR REPLACE INTO drafts (id, data, saved_at) VALUES (?1, ?2, ?3)",
                params![id, data_json, now],
            )
            .map_err(StoreError::write("save_draft"))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<DraftRow>> {
        self.db
            .conn()
            .query_row(
                "SELECT id, data, saved_at FROM drafts WHERE id = ?1",
                [id],
                |row| {
                    Ok(DraftRow {
                        id: row.get(0)?,
                        data_json: row.get(1)?,
                        saved_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::read("get_draft"))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.db
            .conn()
            .execute("DELETE FROM drafts WHERE id = ?1", [id])
            .map_err(StoreError::write("delete_draft"))?;
        Ok(())
    }
}
