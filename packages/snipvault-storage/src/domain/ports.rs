//! Storage Port (Trait Interface)
//!
//! Port/Adapter pattern for backend flexibility:
//! - Development/production: SQLite (zero-config, file-based)
//! - Testing: InMemory (fast unit tests, behavioral oracle)
//!
//! The port consumes an already-authenticated caller identity; ownership
//! checks belong to the calling layer. Both backends must produce
//! identical result sets for identical filters over identical data.

use async_trait::async_trait;

use super::models::{
    Collection, CollectionItem, Comment, NewCollection, NewComment, NewSnippet, NewUser, Snippet,
    User,
};
use crate::error::Result;

/// Snippet Store Port (Primary Interface)
///
/// All storage backends must implement this trait.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Users
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Get user by external identity id
    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Get user by email (first match)
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a user; Conflict if the id already exists
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// Insert or update-by-id, refreshing `updated_at` and preserving
    /// `created_at`
    async fn upsert_user(&self, user: &NewUser) -> Result<User>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Snippets
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Filtered listing, most-recently-updated first
    async fn get_snippets(&self, filter: &SnippetFilter) -> Result<Vec<Snippet>>;

    /// Get snippet by id
    async fn get_snippet(&self, id: i64) -> Result<Option<Snippet>>;

    /// Create a snippet; counters and flags start at their defaults
    async fn create_snippet(&self, draft: &NewSnippet) -> Result<Snippet>;

    /// Replace the insertable fields of an existing snippet
    ///
    /// Counters, flags, share token, and `created_at` are untouched;
    /// `updated_at` is refreshed. Fails if the id is absent.
    async fn update_snippet(&self, id: i64, draft: &NewSnippet) -> Result<Snippet>;

    /// Delete a snippet, cascading its collection-membership rows and
    /// its comments. Fails if the id is absent.
    async fn delete_snippet(&self, id: i64) -> Result<()>;

    /// Atomic relative +1 on the view counter
    ///
    /// A read side effect: does not refresh `updated_at`. Fails if the
    /// id is absent.
    async fn increment_snippet_view_count(&self, id: i64) -> Result<()>;

    /// Flip the favorite flag; fails if the id is absent
    async fn toggle_snippet_favorite(&self, id: i64) -> Result<Snippet>;

    /// Distinct languages across all snippets, sorted
    async fn get_languages(&self) -> Result<Vec<String>>;

    /// Distinct tags across all snippets' tag sets, sorted
    async fn get_tags(&self) -> Result<Vec<String>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Collections
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// List collections, optionally restricted to one owner
    async fn get_collections(&self, user_id: Option<&str>) -> Result<Vec<Collection>>;

    /// Get collection by id
    async fn get_collection(&self, id: i64) -> Result<Option<Collection>>;

    /// Create a collection
    async fn create_collection(&self, draft: &NewCollection) -> Result<Collection>;

    /// Replace the insertable fields of an existing collection
    async fn update_collection(&self, id: i64, draft: &NewCollection) -> Result<Collection>;

    /// Delete a collection, cascading its membership rows
    async fn delete_collection(&self, id: i64) -> Result<()>;

    /// Inner-join projection: the snippets in a collection, in
    /// membership-creation order. Fails if the collection is absent.
    async fn get_collection_snippets(&self, collection_id: i64) -> Result<Vec<Snippet>>;

    /// Add a snippet to a collection
    ///
    /// Fails with the not-found family when either side is absent and
    /// with Conflict when the pair already exists.
    async fn add_snippet_to_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<CollectionItem>;

    /// Remove a membership pair; fails if the pair is absent
    async fn remove_snippet_from_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Sharing
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Look a snippet up by its share token
    ///
    /// Plain token lookup regardless of the public flag; the visibility
    /// policy for private-but-tokened snippets belongs to the caller.
    async fn get_snippet_by_share_id(&self, share_id: &str) -> Result<Option<Snippet>>;

    /// Ensure the snippet carries a share token and return it
    ///
    /// Mints and persists a token only when none exists; an existing
    /// token is returned unchanged (tokens are never rotated).
    async fn generate_share_id(&self, snippet_id: i64) -> Result<String>;

    /// Flip the public flag
    ///
    /// Transitioning to public with no token mints one in the same
    /// operation; transitioning back to private retains the token.
    async fn toggle_snippet_public(&self, snippet_id: i64) -> Result<Snippet>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Comments
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Comments for a snippet, ascending by creation time
    async fn get_snippet_comments(&self, snippet_id: i64) -> Result<Vec<Comment>>;

    /// Create a comment; fails if the snippet is absent
    async fn create_comment(&self, draft: &NewComment) -> Result<Comment>;

    /// Replace a comment's content, refreshing `updated_at`
    async fn update_comment(&self, id: i64, content: &str) -> Result<Comment>;

    /// Delete a comment; fails if the id is absent
    async fn delete_comment(&self, id: i64) -> Result<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Statistics
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Per-entity totals
    async fn get_stats(&self) -> Result<StorageStats>;
}

/// Storage Statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    pub total_users: usize,
    pub total_snippets: usize,
    pub total_collections: usize,
    pub total_collection_items: usize,
    pub total_comments: usize,
}

/// Snippet listing filter
///
/// All criteria are optional and AND-composed. The HTTP layer's
/// repeatable `language`/`tag` query params map onto the list fields
/// here (a single param becomes a one-element list).
#[derive(Debug, Clone, Default)]
pub struct SnippetFilter {
    /// Case-insensitive literal substring across title OR description
    /// OR code
    pub search: Option<String>,

    /// Any-of these languages (exact match); empty = no constraint
    pub languages: Vec<String>,

    /// Tag-set intersection non-empty; empty = no constraint
    pub tags: Vec<String>,

    /// `true` restricts to favorited snippets; `false` is no constraint
    pub favorites: bool,

    /// Exact match on the public flag
    pub is_public: Option<bool>,

    /// Exact owner match; ownerless snippets never match
    pub user_id: Option<String>,
}

impl SnippetFilter {
    /// In-memory predicate: one clause per criterion, AND-composed.
    ///
    /// Substring matching folds ASCII case only, mirroring what the
    /// relational backend's LOWER/LIKE provides.
    pub fn matches(&self, snippet: &Snippet) -> bool {
        if let Some(search) = self.search.as_deref() {
            if !search.is_empty() {
                let needle = search.to_ascii_lowercase();
                let in_title = snippet.title.to_ascii_lowercase().contains(&needle);
                let in_description = snippet
                    .description
                    .as_deref()
                    .unwrap_or("")
                    .to_ascii_lowercase()
                    .contains(&needle);
                let in_code = snippet.code.to_ascii_lowercase().contains(&needle);
                if !(in_title || in_description || in_code) {
                    return false;
                }
            }
        }

        if !self.languages.is_empty() && !self.languages.contains(&snippet.language) {
            return false;
        }

        if !self.tags.is_empty() && !snippet.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }

        if self.favorites && !snippet.is_favorite {
            return false;
        }

        if let Some(is_public) = self.is_public {
            if snippet.is_public != is_public {
                return false;
            }
        }

        if let Some(user_id) = self.user_id.as_deref() {
            if snippet.user_id.as_deref() != Some(user_id) {
                return false;
            }
        }

        true
    }
}
