//! Store error types

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the store
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error type
///
/// A missing key is never an error; lookups return `None` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage could not be opened or migrated
    #[error("failed to initialize storage at {}: {source}", .path.display())]
    Initialization {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },

    /// A write transaction was rejected
    #[error("{op} failed: {source}")]
    Write {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A read query failed
    #[error("{op} failed: {source}")]
    Read {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Clearing the partitions failed; nothing was cleared
    #[error("clear_all failed, partitions left untouched: {0}")]
    Clear(#[source] rusqlite::Error),

    /// A stored row could not be interpreted
    #[error("{op}: corrupt row: {detail}")]
    Corrupt { op: &'static str, detail: String },

    /// Payload could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema setup failed
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// The blocking storage worker panicked or was cancelled
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Error mapper for a failed write, for use with `map_err`
    pub(crate) fn write(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Write { op, source }
    }

    /// Error mapper for a failed read, for use with `map_err`
    pub(crate) fn read(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Read { op, source }
    }

    /// True when the store could not be opened at all
    pub fn is_initialization(&self) -> bool {
        matches!(self, StoreError::Initialization { .. })
    }

    /// True when SQLite reported the disk (or quota) as full
    pub fn is_quota_exceeded(&self) -> bool {
        let source = match self {
            StoreError::Write { source, .. }
            | StoreError::Read { source, .. }
            | StoreError::Clear(source)
            | StoreError::Sqlite(source) => source,
            StoreError::Initialization { source, .. } => return source.is_quota_exceeded(),
            _ => return false,
        };
        source.sqlite_error_code() == Some(rusqlite::ErrorCode::DiskFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_full_is_quota_exceeded() {
        let err = StoreError::Write {
            op: "save_plan",
            source: rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                None,
            ),
        };
        assert!(err.is_quota_exceeded());
        assert!(!err.is_initialization());
        assert!(err.to_string().starts_with("save_plan failed"));
    }

    #[test]
    fn test_initialization_wraps_cause() {
        let err = StoreError::Initialization {
            path: PathBuf::from("/nowhere/tilth.db"),
            source: Box::new(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            ))),
        };
        assert!(err.is_initialization());
        assert!(!err.is_quota_exceeded());
        assert!(err.to_string().contains("/nowhere/tilth.db"));
    }
}
