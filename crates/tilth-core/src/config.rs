//! Store configuration
//!
//! Loaded from TOML when the host application keeps a config file, otherwise
//! built in code:
//!
//! ```toml
//! database_path = "/home/me/.tilth/tilth.db"
//! busy_timeout_ms = 5000
//! wal = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::paths;

/// Path value selecting an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Local store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file, or `:memory:`
    pub database_path: PathBuf,
    /// How long a write waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Use write-ahead logging (file databases only)
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: paths::default_db_path(),
            busy_timeout_ms: 5000,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// Configuration for a database file at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::at(IN_MEMORY)
    }

    /// Parse configuration from TOML text; missing fields take defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    ///
    /// A file that cannot be read is `StoreError::Io`; bad contents are
    /// `StoreError::Config`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
