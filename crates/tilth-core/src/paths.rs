//! Filesystem locations

use std::path::PathBuf;

/// Directory holding Tilth's local data (`~/.tilth`)
///
/// Falls back to the current directory when no home directory can be resolved.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".tilth"))
        .unwrap_or_else(|| PathBuf::from(".tilth"))
}

/// Default location of the local database
pub fn default_db_path() -> PathBuf {
    data_dir().join("tilth.db")
}
