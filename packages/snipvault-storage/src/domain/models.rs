//! Domain records for the snippet vault.
//!
//! Plain data contracts shared by every backend:
//! - `User`: identity record keyed by an external identity id
//! - `Snippet`: the central entity (code + tags + sharing state)
//! - `Collection` / `CollectionItem`: many-to-many grouping of snippets
//! - `Comment`: discussion attached to a snippet
//!
//! Each persisted record has a `New*` insertable variant carrying the
//! caller-supplied fields; surrogate ids, counters, and timestamps are
//! assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Length of an opaque share token.
pub const SHARE_ID_LEN: usize = 8;

/// Mint a fresh opaque share token.
///
/// Tokens are URL-safe and unguessable; they grant read access to a
/// snippet independent of its public flag.
pub fn new_share_id() -> String {
    nanoid::nanoid!(SHARE_ID_LEN)
}

/// Identity record.
///
/// The id is issued by the external identity provider, not by this
/// layer; users are upserted on login and never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable user payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StorageError::validation("user id must not be empty"));
        }
        Ok(())
    }
}

/// The central entity.
///
/// Invariant: `is_public == true` implies `share_id` is `Some` (a public
/// snippet is always reachable by its token). The reverse does not hold:
/// a private snippet may keep a token for link-based sharing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    /// Owning user, nullable — seed data may be ownerless.
    pub user_id: Option<String>,
    pub view_count: i64,
    pub is_favorite: bool,
    pub is_public: bool,
    pub share_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable snippet payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSnippet {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub user_id: Option<String>,
}

impl NewSnippet {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StorageError::validation("snippet title must not be empty"));
        }
        if self.code.trim().is_empty() {
            return Err(StorageError::validation("snippet code must not be empty"));
        }
        if self.language.trim().is_empty() {
            return Err(StorageError::validation(
                "snippet language must not be empty",
            ));
        }
        Ok(())
    }

    /// Tag set as stored: trimmed, empties dropped, duplicates removed.
    ///
    /// Order is irrelevant to filtering; first occurrence wins so the
    /// stored form stays stable across writes.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            if !seen.iter().any(|t| t == tag) {
                seen.push(tag.to_string());
            }
        }
        seen
    }
}

/// Named grouping of snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable collection payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub user_id: Option<String>,
}

impl NewCollection {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StorageError::validation(
                "collection name must not be empty",
            ));
        }
        Ok(())
    }
}

/// Join record: "this snippet belongs to this collection".
///
/// The `(collection_id, snippet_id)` pair is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: i64,
    pub collection_id: i64,
    pub snippet_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Discussion attached to a snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub snippet_id: i64,
    pub content: String,
    pub author_name: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable comment payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComment {
    pub snippet_id: i64,
    pub content: String,
    pub author_name: Option<String>,
    pub user_id: Option<String>,
}

impl NewComment {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(StorageError::validation(
                "comment content must not be empty",
            ));
        }
        Ok(())
    }
}
