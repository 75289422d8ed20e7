//! Helper utilities for cumulus testing

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary local directory laid out as an object store
///
/// Each key becomes a file under the directory, so the store can be opened
/// through a `file://` URL.
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    /// Creates a new empty store
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Creates a store holding `content` under every key
    pub fn with_keys(keys: &[&str], content: &[u8]) -> Result<Self> {
        let store = Self::new()?;
        for key in keys {
            store.create_object(key, content)?;
        }
        Ok(store)
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The `file://` URL of the store
    pub fn url(&self) -> String {
        format!("file://{}", self.dir.path().display())
    }

    /// Writes an object under the given key
    pub fn create_object(&self, key: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Reads an object back from disk
    pub fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.dir.path().join(key))?)
    }

    /// Whether an object file exists for the key
    pub fn has_object(&self, key: &str) -> bool {
        self.dir.path().join(key).is_file()
    }
}
