//! snipvault-storage — persistence and query layer for a snippet vault.
//!
//! Users store, tag, organize, favorite, and selectively publish code
//! snippets; this crate owns the persisted state and the queries over
//! it. HTTP routing, auth, and UI are external collaborators: callers
//! hand in an already-authenticated user id (or none) and get plain
//! domain records back.
//!
//! # Architecture
//!
//! ```text
//! callers (route handlers)
//!           ↓
//! domain/ (records, SnippetStore port, filter composition)
//!           ↓
//! infrastructure/ (InMemory, SQLite)
//! ```
//!
//! Backends are interchangeable behind the [`SnippetStore`] trait:
//! - Development/production: SQLite (zero-config, file-based)
//! - Testing: InMemory (fast, doubles as the behavioral oracle)
//!
//! Both backends must return identical result sets for identical
//! filters over identical data; `tests/store_contract.rs` runs one
//! suite against both to hold them to it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use snipvault_storage::{open_store, NewSnippet, SnippetFilter, StorageConfig};
//!
//! # async fn example() -> snipvault_storage::Result<()> {
//! let store = open_store(&StorageConfig::Memory)?;
//!
//! let snippet = store
//!     .create_snippet(&NewSnippet {
//!         title: "Hello".into(),
//!         code: "print(1)".into(),
//!         language: "python".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! // Publish: flips the flag and mints the share token in one step.
//! let published = store.toggle_snippet_public(snippet.id).await?;
//! assert!(published.is_public && published.share_id.is_some());
//!
//! let rust_faves = store
//!     .get_snippets(&SnippetFilter {
//!         languages: vec!["rust".into()],
//!         favorites: true,
//!         ..Default::default()
//!     })
//!     .await?;
//! # let _ = rust_faves;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use config::{open_store, StorageConfig};
pub use error::{ErrorKind, Result, StorageError};

// Domain re-exports
pub use domain::{
    Collection, CollectionItem, Comment, NewCollection, NewComment, NewSnippet, NewUser, Snippet,
    SnippetFilter, SnippetStore, StorageStats, User,
};

// Backends (prefer `open_store` unless a concrete type is needed)
pub use infrastructure::InMemorySnippetStore;
#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteSnippetStore;
