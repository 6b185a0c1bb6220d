//! Storage Infrastructure Layer
//!
//! Multiple storage backends for the SnippetStore trait

pub mod memory_store;
pub use memory_store::InMemorySnippetStore;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteSnippetStore;

// If the sqlite feature is disabled, fall back to InMemory
#[cfg(not(feature = "sqlite"))]
pub type SqliteSnippetStore = InMemorySnippetStore;
