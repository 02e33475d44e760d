//! Database connection
//!
//! Opens the configured document store and hands out collection handles.
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::load()?;
//! let db = Database::open(&config)?;
//! let notes = NoteRepository::from_database(&db, &config);
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::store::{AutomergeStore, Collection};

/// Handle to an open document store
#[derive(Clone)]
pub struct Database {
    store: AutomergeStore,
}

impl Database {
    /// Open the file-backed store described by `config`
    ///
    /// Creates the store file on first run.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.store_path();
        let store = AutomergeStore::open(&path)
            .with_context(|| format!("Failed to open document store at {:?}", path))?
            .with_batch_size(config.cursor_batch_size);
        Ok(Self { store })
    }

    /// Open an empty store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            store: AutomergeStore::in_memory(),
        }
    }

    /// Get a handle to a named collection
    pub fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(self.store.collection(name))
    }

    /// The underlying store
    pub fn store(&self) -> &AutomergeStore {
        &self.store
    }
}
