//! Extension of gdmconfig for the local store location

use anyhow::Result;
use std::path::PathBuf;

const DEFAULT_STORAGE_DIR: &str = "data";
const DEFAULT_DATABASE: &str = "gdmusic.db";

/// Extension trait for `gdmconfig::Config`
pub trait StoreConfigExt {
    /// Path of the SQLite database shared by all stores
    ///
    /// The storage directory is created if needed.
    fn store_db_path(&self) -> Result<PathBuf>;
}

impl StoreConfigExt for gdmconfig::Config {
    fn store_db_path(&self) -> Result<PathBuf> {
        let dir = self.get_managed_dir(&["storage", "directory"], DEFAULT_STORAGE_DIR)?;
        let file = self.get_string_or(&["storage", "database"], DEFAULT_DATABASE);
        Ok(PathBuf::from(dir).join(file))
    }
}
