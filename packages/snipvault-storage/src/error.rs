//! Error types for snipvault-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Underlying store failure (SQLite)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Malformed insert payload (required fields missing or blank)
    Validation,
    /// Duplicate key or duplicate collection-membership pair
    Conflict,
    /// Snippet not found
    SnippetNotFound,
    /// Collection not found
    CollectionNotFound,
    /// Collection-membership pair not found
    CollectionItemNotFound,
    /// Comment not found
    CommentNotFound,
    /// User not found
    UserNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::SnippetNotFound => "snippet_not_found",
            ErrorKind::CollectionNotFound => "collection_not_found",
            ErrorKind::CollectionItemNotFound => "collection_item_not_found",
            ErrorKind::CommentNotFound => "comment_not_found",
            ErrorKind::UserNotFound => "user_not_found",
        }
    }

    /// Whether this kind belongs to the not-found family.
    ///
    /// NotFound and Conflict are expected, recoverable-by-caller
    /// conditions; Database is an infrastructure fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorKind::SnippetNotFound
                | ErrorKind::CollectionNotFound
                | ErrorKind::CollectionItemNotFound
                | ErrorKind::CommentNotFound
                | ErrorKind::UserNotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind.is_not_found()
    }

    // Convenience constructors
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn snippet_not_found(id: i64) -> Self {
        Self::new(
            ErrorKind::SnippetNotFound,
            format!("Snippet not found: {}", id),
        )
    }

    pub fn collection_not_found(id: i64) -> Self {
        Self::new(
            ErrorKind::CollectionNotFound,
            format!("Collection not found: {}", id),
        )
    }

    pub fn collection_item_not_found(collection_id: i64, snippet_id: i64) -> Self {
        Self::new(
            ErrorKind::CollectionItemNotFound,
            format!(
                "Snippet {} is not in collection {}",
                snippet_id, collection_id
            ),
        )
    }

    pub fn comment_not_found(id: i64) -> Self {
        Self::new(
            ErrorKind::CommentNotFound,
            format!("Comment not found: {}", id),
        )
    }

    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::UserNotFound,
            format!("User not found: {}", id.into()),
        )
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

// JSON error conversions (tag-set column round-trip)
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
