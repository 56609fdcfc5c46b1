//! Async local store
//!
//! `LocalStore` is the handle the application holds. It opens the database
//! lazily on first use, serializes every operation through one connection in
//! the order the operations were issued, and runs the SQLite work on tokio's
//! blocking pool so callers can issue operations concurrently without locking
//! of their own.
//!
//! ```no_run
//! # async fn demo() -> tilth_core::Result<()> {
//! use serde_json::json;
//! use tilth_core::{LocalStore, NewChange, StoreConfig, StoredPlan};
//!
//! let store = LocalStore::new(StoreConfig::default());
//! store.init().await?;
//!
//! let plan = StoredPlan::new("plot-7", "Back Yard", json!({"beds": []}));
//! store.save_plan(&plan).await?;
//! store.add_pending_change(NewChange::create("plans", &plan)).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::model::{Draft, NewChange, PendingChange, StoredPlan};
use crate::storage::{
    expires_at, now_millis, CacheStore, ChangeId, ChangeQueue, Database, DraftStore, PlanStore,
    PreferenceStore,
};

type SharedDatabase = Arc<Mutex<Database>>;

/// Cloneable handle to the local store
///
/// Clones share one database connection. Construct one per database and pass
/// it to whatever needs storage.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

struct Inner {
    config: StoreConfig,
    db: OnceCell<SharedDatabase>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("database_path", &self.inner.config.database_path)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl LocalStore {
    /// Create a handle; no storage is touched until first use
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                db: OnceCell::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.db.initialized()
    }

    /// Open and migrate the database
    ///
    /// Safe to call repeatedly and concurrently; only one open ever runs at a
    /// time. A failed open is not cached, so a later call retries.
    pub async fn init(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    async fn handle(&self) -> Result<SharedDatabase> {
        let config = self.inner.config.clone();
        let db = self
            .inner
            .db
            .get_or_try_init(|| async move {
                let path = config.database_path.clone();

                let opened = tokio::task::spawn_blocking(move || Database::open(&config))
                    .await
                    .map_err(StoreError::from)
                    .and_then(|result| result);

                match opened {
                    Ok(db) => {
                        info!(path = %path.display(), "Local store ready");
                        Ok(Arc::new(Mutex::new(db)))
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "Failed to open local store: {}", e);
                        Err(StoreError::Initialization {
                            path,
                            source: Box::new(e),
                        })
                    }
                }
            })
            .await?;
        Ok(Arc::clone(db))
    }

    /// Run one storage operation on the blocking pool
    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Database) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.handle().await?;
        // tokio's mutex is fair, so operations run in the order they were issued
        let guard = db.lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let db: &Database = &guard;
            op(db)
        })
        .await?
    }

    /// Empty every partition. The handle stays usable afterwards
    pub async fn clear_all(&self) -> Result<()> {
        self.run(|db| db.clear_all()).await
    }

    // =========================================================================
    // Plans
    // =========================================================================

    /// Insert or overwrite a plan by id
    pub async fn save_plan<T: Serialize>(&self, plan: &StoredPlan<T>) -> Result<()> {
        let row = plan.to_row()?;
        self.run(move |db| PlanStore::new(db).upsert(&row)).await
    }

    pub async fn get_plan<T: DeserializeOwned>(&self, id: &str) -> Result<Option<StoredPlan<T>>> {
        let id = id.to_string();
        self.run(move |db| PlanStore::new(db).get(&id))
            .await?
            .map(StoredPlan::from_row)
            .transpose()
    }

    /// All plans, most recently written first (ties by id)
    pub async fn get_all_plans<T: DeserializeOwned>(&self) -> Result<Vec<StoredPlan<T>>> {
        self.run(|db| PlanStore::new(db).list())
            .await?
            .into_iter()
            .map(StoredPlan::from_row)
            .collect()
    }

    /// Flag a plan as accepted remotely; unknown ids are ignored
    pub async fn mark_plan_synced(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |db| PlanStore::new(db).mark_synced(&id))
            .await
            .map(|_| ())
    }

    /// Delete a plan; unknown ids are ignored
    pub async fn delete_plan(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |db| PlanStore::new(db).delete(&id))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Pending-change outbox
    // =========================================================================

    /// Record a local mutation; the store assigns id, timestamp and `synced`
    pub async fn add_pending_change<T: Serialize>(
        &self,
        change: NewChange<T>,
    ) -> Result<PendingChange<T>> {
        let data_json = serde_json::to_string(&change.data)?;
        let kind = change.kind;
        let table = change.table.clone();
        let row = self
            .run(move |db| ChangeQueue::new(db).push(kind, &table, &data_json, now_millis()))
            .await?;

        Ok(PendingChange {
            id: row.id,
            kind: row.kind,
            table: change.table,
            data: change.data,
            timestamp: row.timestamp,
            synced: row.synced,
        })
    }

    /// Every recorded change in insertion order, including acknowledged ones
    pub async fn get_pending_changes<T: DeserializeOwned>(&self) -> Result<Vec<PendingChange<T>>> {
        self.run(|db| ChangeQueue::new(db).list_all())
            .await?
            .into_iter()
            .map(PendingChange::from_row)
            .collect()
    }

    /// Changes still awaiting remote confirmation, in insertion order
    pub async fn get_unsynced_changes<T: DeserializeOwned>(
        &self,
    ) -> Result<Vec<PendingChange<T>>> {
        self.run(|db| ChangeQueue::new(db).list_unsynced())
            .await?
            .into_iter()
            .map(PendingChange::from_row)
            .collect()
    }

    /// Acknowledge a change. Repeated or unknown ids succeed silently
    pub async fn mark_change_as_synced(&self, id: ChangeId) -> Result<()> {
        let updated = self
            .run(move |db| ChangeQueue::new(db).mark_synced(id))
            .await?;
        if !updated {
            debug!(id, "Change already synced or unknown");
        }
        Ok(())
    }

    /// Drop acknowledged changes; returns how many were removed
    pub async fn purge_synced_changes(&self) -> Result<usize> {
        self.run(|db| ChangeQueue::new(db).purge_synced()).await
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub async fn save_preference<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let key = key.to_string();
        let value_json = serde_json::to_string(value)?;
        self.run(move |db| PreferenceStore::new(db).set(&key, &value_json, now_millis()))
            .await
    }

    pub async fn get_preference<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = key.to_string();
        let value = self.run(move |db| PreferenceStore::new(db).get(&key)).await?;
        value
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    pub async fn delete_preference(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run(move |db| PreferenceStore::new(db).delete(&key)).await
    }

    // =========================================================================
    // Drafts
    // =========================================================================

    pub async fn save_draft<T: Serialize + ?Sized>(&self, id: &str, data: &T) -> Result<()> {
        let id = id.to_string();
        let data_json = serde_json::to_string(data)?;
        self.run(move |db| DraftStore::new(db).save(&id, &data_json, now_millis()))
            .await
    }

    pub async fn get_draft<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        Ok(self.get_draft_entry(id).await?.map(|draft| draft.data))
    }

    /// Draft payload together with when it was saved
    pub async fn get_draft_entry<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Draft<T>>> {
        let id = id.to_string();
        self.run(move |db| DraftStore::new(db).get(&id))
            .await?
            .map(Draft::from_row)
            .transpose()
    }

    pub async fn delete_draft(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |db| DraftStore::new(db).delete(&id)).await
    }

    // =========================================================================
    // TTL cache
    // =========================================================================

    /// Cache a value for `ttl_minutes`
    ///
    /// A TTL that is zero, negative or not finite expires immediately: the
    /// next read misses and the next sweep removes the entry.
    pub async fn cache_data<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        ttl_minutes: f64,
    ) -> Result<()> {
        let key = key.to_string();
        let data_json = serde_json::to_string(data)?;
        if !ttl_minutes.is_finite() || ttl_minutes <= 0.0 {
            debug!(key = %key, ttl_minutes, "Non-positive TTL, entry expires immediately");
        }
        self.run(move |db| {
            let expires = expires_at(now_millis(), ttl_minutes);
            CacheStore::new(db).put(&key, &data_json, expires)
        })
        .await
    }

    /// Read a cached value; an expired entry is evicted and reported as a miss
    pub async fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = key.to_string();
        let value = self
            .run(move |db| CacheStore::new(db).get(&key, now_millis()))
            .await?;
        value
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    /// Remove every expired cache entry; returns how many were removed
    ///
    /// The store never calls this on its own. Applications schedule it.
    pub async fn cleanup_cache(&self) -> Result<usize> {
        self.run(|db| CacheStore::new(db).sweep(now_millis())).await
    }
}
