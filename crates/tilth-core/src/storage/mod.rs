//! Persistence layer
//!
//! SQLite-based storage for the five local partitions:
//! - Saved garden plans
//! - Pending-change outbox awaiting remote sync
//! - User preferences
//! - Form drafts
//! - TTL cache

mod cache;
mod database;
mod drafts;
mod outbox;
mod plans;
mod preferences;


pub use cache::{expires_at, CacheStore};
pub use database::Database;
pub use drafts::{DraftRow, DraftStore};
pub use outbox::{ChangeId, ChangeKind, ChangeQueue, ChangeRow};
pub use plans::{PlanRow, PlanStore};
pub use preferences::PreferenceStore;

/// Get current Unix timestamp in milliseconds
#[inline]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
