//! Tilth Core - offline-first local storage
//!
//! Keeps the garden planner usable without a network connection:
//! - Saved plans, upserted by id
//! - An outbox of pending changes replayed to the backend in order
//! - User preferences and form drafts
//! - A TTL cache with lazy and proactive eviction
//!
//! Everything lives in one SQLite database behind [`LocalStore`].

pub mod config;
pub mod error;
pub mod model;
pub mod paths;
pub mod storage;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use model::{Draft, NewChange, PendingChange, StoredPlan};
pub use storage::{ChangeId, ChangeKind};
pub use store::LocalStore;
pub use sync::{replay_pending, SyncFailure, SyncReport, SyncTarget};
