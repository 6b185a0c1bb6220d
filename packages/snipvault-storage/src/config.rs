//! Backend selection and store construction.
//!
//! The storage layer exposes no process-wide singleton: the host builds
//! a [`StorageConfig`] once at startup, opens the store, and passes the
//! `Arc<dyn SnippetStore>` down to its route layer.

#[cfg(feature = "sqlite")]
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::ports::SnippetStore;
use crate::error::Result;
use crate::infrastructure::InMemorySnippetStore;
#[cfg(feature = "sqlite")]
use crate::infrastructure::SqliteSnippetStore;

/// Which backend to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Volatile keyed maps; for tests and ephemeral hosts.
    #[default]
    Memory,

    /// File-based SQLite database.
    #[cfg(feature = "sqlite")]
    Sqlite { path: PathBuf },
}

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn SnippetStore>> {
    match config {
        StorageConfig::Memory => {
            tracing::info!(backend = "memory", "opening snippet store");
            Ok(Arc::new(InMemorySnippetStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            tracing::info!(backend = "sqlite", path = %path.display(), "opening snippet store");
            Ok(Arc::new(SqliteSnippetStore::new(path)?))
        }
    }
}
