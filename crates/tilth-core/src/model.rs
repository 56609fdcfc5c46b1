//! Typed records exchanged with callers
//!
//! Payloads are generic and default to `serde_json::Value`. The store encodes
//! them as JSON at the boundary and never looks inside.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::storage::{now_millis, ChangeId, ChangeKind, ChangeRow, DraftRow, PlanRow};

/// A saved garden design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlan<T = Value> {
    pub id: String,
    pub name: String,
    /// Design payload (beds, paths, ...)
    pub data: T,
    /// Last write time, epoch milliseconds
    pub timestamp: i64,
    /// True once the remote backend accepted this version
    pub synced: bool,
}

impl<T> StoredPlan<T> {
    /// A fresh, unsynced plan stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data,
            timestamp: now_millis(),
            synced: false,
        }
    }

    /// Record a local edit: bump the timestamp and clear `synced`
    pub fn touch(&mut self) {
        self.timestamp = now_millis().max(self.timestamp.saturating_add(1));
        self.synced = false;
    }
}

impl<T: Serialize> StoredPlan<T> {
    pub(crate) fn to_row(&self) -> Result<PlanRow> {
        Ok(PlanRow {
            id: self.id.clone(),
            name: self.name.clone(),
            data_json: serde_json::to_string(&self.data)?,
            timestamp: self.timestamp,
            synced: self.synced,
        })
    }
}

impl<T: DeserializeOwned> StoredPlan<T> {
    pub(crate) fn from_row(row: PlanRow) -> Result<Self> {
        Ok(Self {
            data: serde_json::from_str(&row.data_json)?,
            id: row.id,
            name: row.name,
            timestamp: row.timestamp,
            synced: row.synced,
        })
    }
}

/// The caller-supplied part of an outbox entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChange<T = Value> {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Remote collection the change targets
    pub table: String,
    pub data: T,
}

impl<T> NewChange<T> {
    pub fn new(kind: ChangeKind, table: impl Into<String>, data: T) -> Self {
        Self {
            kind,
            table: table.into(),
            data,
        }
    }

    pub fn create(table: impl Into<String>, data: T) -> Self {
        Self::new(ChangeKind::Create, table, data)
    }

    pub fn update(table: impl Into<String>, data: T) -> Self {
        Self::new(ChangeKind::Update, table, data)
    }

    pub fn delete(table: impl Into<String>, data: T) -> Self {
        Self::new(ChangeKind::Delete, table, data)
    }
}

/// A local mutation recorded in the outbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange<T = Value> {
    pub id: ChangeId,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    pub data: T,
    pub timestamp: i64,
    pub synced: bool,
}

impl<T: DeserializeOwned> PendingChange<T> {
    pub(crate) fn from_row(row: ChangeRow) -> Result<Self> {
        Ok(Self {
            data: serde_json::from_str(&row.data_json)?,
            id: row.id,
            kind: row.kind,
            table: row.table,
            timestamp: row.timestamp,
            synced: row.synced,
        })
    }
}

/// Saved form state with the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft<T = Value> {
    pub id: String,
    pub data: T,
    pub saved_at: i64,
}

impl<T: DeserializeOwned> Draft<T> {
    pub(crate) fn from_row(row: DraftRow) -> Result<Self> {
        Ok(Self {
            data: serde_json::from_str(&row.data_json)?,
            id: row.id,
            saved_at: row.saved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_touch_bumps_and_unsyncs() {
        let mut plan = StoredPlan::new("p", "Plot", json!({"beds": []}));
        plan.synced = true;
        let before = plan.timestamp;

        plan.touch();
        assert!(plan.timestamp > before);
        assert!(!plan.synced);
    }

    #[test]
    fn test_change_serializes_kind_as_type() {
        let change = NewChange::create("plans", json!({"id": "p"}));
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(
            value,
            json!({"type": "create", "table": "plans", "data": {"id": "p"}})
        );
    }

    #[test]
    fn test_plan_row_round_trip_keeps_payload() {
        let plan = StoredPlan {
            id: "p".to_string(),
            name: "Plot".to_string(),
            data: json!({"beds": [{"w": 4, "h": 8}]}),
            timestamp: 7,
            synced: true,
        };
        let row = plan.to_row().unwrap();
        assert_eq!(row.timestamp, 7);
        assert!(row.synced);
        assert_eq!(StoredPlan::<Value>::from_row(row).unwrap(), plan);
    }
}
