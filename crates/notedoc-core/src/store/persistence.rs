//! Store file persistence
//!
//! Saves and loads the Automerge document backing a file-based store. Uses
//! atomic writes (write to temp file, then rename) to prevent corruption.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use automerge::AutoCommit;

use super::error::{StoreError, StoreResult};

/// On-disk location of a store
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the store file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document from disk
    ///
    /// Returns `None` if the file doesn't exist.
    pub fn load(&self) -> StoreResult<Option<AutoCommit>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(e, &self.path))?;
        let doc = AutoCommit::load(&bytes).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            details: e.to_string(),
        })?;

        Ok(Some(doc))
    }

    /// Save the document to disk using atomic write
    pub fn save(&self, doc: &mut AutoCommit) -> StoreResult<()> {
        self.write(&doc.save())
    }

    /// Replace the file contents with already serialized document bytes
    ///
    /// Blocks on file I/O; async callers run it on the blocking pool.
    pub fn write(&self, bytes: &[u8]) -> StoreResult<()> {
        atomic_write(&self.path, bytes)
    }

    /// Size of the store file in bytes, 0 if missing
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(e, parent))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path).map_err(|e| StoreError::io(e, &temp_path))?;
    file.write_all(data)
        .map_err(|e| StoreError::io(e, &temp_path))?;
    file.sync_all().map_err(|e| StoreError::io(e, &temp_path))?;

    fs::rename(&temp_path, path).map_err(|e| StoreError::io(e, path))?;

    Ok(())
}
