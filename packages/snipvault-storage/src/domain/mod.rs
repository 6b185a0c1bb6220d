//! Storage Domain Layer
//!
//! Port/Adapter pattern for storage backend abstraction

pub mod models;
pub mod ports;

pub use models::{
    new_share_id, Collection, CollectionItem, Comment, NewCollection, NewComment, NewSnippet,
    NewUser, Snippet, User, SHARE_ID_LEN,
};
pub use ports::{SnippetFilter, SnippetStore, StorageStats};
