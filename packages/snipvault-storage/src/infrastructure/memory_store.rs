//! In-Memory Snippet Store (reference backend)
//!
//! HashMap-based implementation used for tests and as the behavioral
//! oracle for the relational backend. Each entity collection sits
//! behind its own RwLock; surrogate ids come from shared atomic
//! counters so clones keep handing out fresh ids.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::domain::models::{
    new_share_id, Collection, CollectionItem, Comment, NewCollection, NewComment, NewSnippet,
    NewUser, Snippet, User,
};
use crate::domain::ports::{SnippetFilter, SnippetStore, StorageStats};
use crate::error::{Result, StorageError};

#[derive(Clone)]
pub struct InMemorySnippetStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    snippets: Arc<RwLock<HashMap<i64, Snippet>>>,
    collections: Arc<RwLock<HashMap<i64, Collection>>>,
    collection_items: Arc<RwLock<HashMap<i64, CollectionItem>>>,
    comments: Arc<RwLock<HashMap<i64, Comment>>>,
    next_snippet_id: Arc<AtomicI64>,
    next_collection_id: Arc<AtomicI64>,
    next_item_id: Arc<AtomicI64>,
    next_comment_id: Arc<AtomicI64>,
}

impl InMemorySnippetStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            snippets: Arc::new(RwLock::new(HashMap::new())),
            collections: Arc::new(RwLock::new(HashMap::new())),
            collection_items: Arc::new(RwLock::new(HashMap::new())),
            comments: Arc::new(RwLock::new(HashMap::new())),
            next_snippet_id: Arc::new(AtomicI64::new(1)),
            next_collection_id: Arc::new(AtomicI64::new(1)),
            next_item_id: Arc::new(AtomicI64::new(1)),
            next_comment_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Create new in-memory store (alias for new, for constructor parity
    /// with the SQLite backend)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new())
    }
}

impl Default for InMemorySnippetStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Most-recently-updated first, id as the deterministic tie-break.
fn sort_recent_first(snippets: &mut [Snippet]) {
    snippets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl SnippetStore for InMemorySnippetStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StorageError::conflict(format!(
                "user '{}' already exists",
                user.id
            )));
        }
        let now = Utc::now();
        let record = User {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        let mut users = self.users.write();
        let now = Utc::now();
        let record = match users.get_mut(&user.id) {
            Some(existing) => {
                existing.email = user.email.clone();
                existing.name = user.name.clone();
                existing.avatar_url = user.avatar_url.clone();
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let record = User {
                    id: user.id.clone(),
                    email: user.email.clone(),
                    name: user.name.clone(),
                    avatar_url: user.avatar_url.clone(),
                    created_at: now,
                    updated_at: now,
                };
                users.insert(record.id.clone(), record.clone());
                record
            }
        };
        Ok(record)
    }

    async fn get_snippets(&self, filter: &SnippetFilter) -> Result<Vec<Snippet>> {
        let mut out: Vec<Snippet> = self
            .snippets
            .read()
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sort_recent_first(&mut out);
        Ok(out)
    }

    async fn get_snippet(&self, id: i64) -> Result<Option<Snippet>> {
        Ok(self.snippets.read().get(&id).cloned())
    }

    async fn create_snippet(&self, draft: &NewSnippet) -> Result<Snippet> {
        draft.validate()?;
        let now = Utc::now();
        let snippet = Snippet {
            id: self.next_snippet_id.fetch_add(1, Ordering::SeqCst),
            title: draft.title.clone(),
            description: draft.description.clone(),
            code: draft.code.clone(),
            language: draft.language.clone(),
            tags: draft.normalized_tags(),
            user_id: draft.user_id.clone(),
            view_count: 0,
            is_favorite: false,
            is_public: false,
            share_id: None,
            created_at: now,
            updated_at: now,
        };
        self.snippets.write().insert(snippet.id, snippet.clone());
        Ok(snippet)
    }

    async fn update_snippet(&self, id: i64, draft: &NewSnippet) -> Result<Snippet> {
        draft.validate()?;
        let mut snippets = self.snippets.write();
        let snippet = snippets
            .get_mut(&id)
            .ok_or_else(|| StorageError::snippet_not_found(id))?;
        snippet.title = draft.title.clone();
        snippet.description = draft.description.clone();
        snippet.code = draft.code.clone();
        snippet.language = draft.language.clone();
        snippet.tags = draft.normalized_tags();
        snippet.user_id = draft.user_id.clone();
        snippet.updated_at = Utc::now();
        Ok(snippet.clone())
    }

    async fn delete_snippet(&self, id: i64) -> Result<()> {
        if self.snippets.write().remove(&id).is_none() {
            return Err(StorageError::snippet_not_found(id));
        }
        self.collection_items
            .write()
            .retain(|_, item| item.snippet_id != id);
        self.comments
            .write()
            .retain(|_, comment| comment.snippet_id != id);
        Ok(())
    }

    async fn increment_snippet_view_count(&self, id: i64) -> Result<()> {
        let mut snippets = self.snippets.write();
        let snippet = snippets
            .get_mut(&id)
            .ok_or_else(|| StorageError::snippet_not_found(id))?;
        snippet.view_count += 1;
        Ok(())
    }

    async fn toggle_snippet_favorite(&self, id: i64) -> Result<Snippet> {
        let mut snippets = self.snippets.write();
        let snippet = snippets
            .get_mut(&id)
            .ok_or_else(|| StorageError::snippet_not_found(id))?;
        snippet.is_favorite = !snippet.is_favorite;
        snippet.updated_at = Utc::now();
        Ok(snippet.clone())
    }

    async fn get_languages(&self) -> Result<Vec<String>> {
        let languages: BTreeSet<String> = self
            .snippets
            .read()
            .values()
            .map(|s| s.language.clone())
            .collect();
        Ok(languages.into_iter().collect())
    }

    async fn get_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .snippets
            .read()
            .values()
            .flat_map(|s| s.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }

    async fn get_collections(&self, user_id: Option<&str>) -> Result<Vec<Collection>> {
        let mut out: Vec<Collection> = self
            .collections
            .read()
            .values()
            .filter(|c| match user_id {
                Some(owner) => c.user_id.as_deref() == Some(owner),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        Ok(self.collections.read().get(&id).cloned())
    }

    async fn create_collection(&self, draft: &NewCollection) -> Result<Collection> {
        draft.validate()?;
        let now = Utc::now();
        let collection = Collection {
            id: self.next_collection_id.fetch_add(1, Ordering::SeqCst),
            name: draft.name.clone(),
            description: draft.description.clone(),
            user_id: draft.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.collections
            .write()
            .insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn update_collection(&self, id: i64, draft: &NewCollection) -> Result<Collection> {
        draft.validate()?;
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(&id)
            .ok_or_else(|| StorageError::collection_not_found(id))?;
        collection.name = draft.name.clone();
        collection.description = draft.description.clone();
        collection.user_id = draft.user_id.clone();
        collection.updated_at = Utc::now();
        Ok(collection.clone())
    }

    async fn delete_collection(&self, id: i64) -> Result<()> {
        if self.collections.write().remove(&id).is_none() {
            return Err(StorageError::collection_not_found(id));
        }
        self.collection_items
            .write()
            .retain(|_, item| item.collection_id != id);
        Ok(())
    }

    async fn get_collection_snippets(&self, collection_id: i64) -> Result<Vec<Snippet>> {
        if !self.collections.read().contains_key(&collection_id) {
            return Err(StorageError::collection_not_found(collection_id));
        }
        let mut items: Vec<CollectionItem> = self
            .collection_items
            .read()
            .values()
            .filter(|item| item.collection_id == collection_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let snippets = self.snippets.read();
        Ok(items
            .iter()
            .filter_map(|item| snippets.get(&item.snippet_id).cloned())
            .collect())
    }

    async fn add_snippet_to_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<CollectionItem> {
        if !self.collections.read().contains_key(&collection_id) {
            return Err(StorageError::collection_not_found(collection_id));
        }
        if !self.snippets.read().contains_key(&snippet_id) {
            return Err(StorageError::snippet_not_found(snippet_id));
        }
        let mut items = self.collection_items.write();
        if items
            .values()
            .any(|item| item.collection_id == collection_id && item.snippet_id == snippet_id)
        {
            return Err(StorageError::conflict(format!(
                "snippet {} is already in collection {}",
                snippet_id, collection_id
            )));
        }
        let item = CollectionItem {
            id: self.next_item_id.fetch_add(1, Ordering::SeqCst),
            collection_id,
            snippet_id,
            created_at: Utc::now(),
        };
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn remove_snippet_from_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<()> {
        let mut items = self.collection_items.write();
        let id = items
            .values()
            .find(|item| item.collection_id == collection_id && item.snippet_id == snippet_id)
            .map(|item| item.id);
        match id {
            Some(id) => {
                items.remove(&id);
                Ok(())
            }
            None => Err(StorageError::collection_item_not_found(
                collection_id,
                snippet_id,
            )),
        }
    }

    async fn get_snippet_by_share_id(&self, share_id: &str) -> Result<Option<Snippet>> {
        Ok(self
            .snippets
            .read()
            .values()
            .find(|s| s.share_id.as_deref() == Some(share_id))
            .cloned())
    }

    async fn generate_share_id(&self, snippet_id: i64) -> Result<String> {
        let mut snippets = self.snippets.write();
        let snippet = snippets
            .get_mut(&snippet_id)
            .ok_or_else(|| StorageError::snippet_not_found(snippet_id))?;
        if let Some(token) = &snippet.share_id {
            return Ok(token.clone());
        }
        let token = new_share_id();
        snippet.share_id = Some(token.clone());
        snippet.updated_at = Utc::now();
        Ok(token)
    }

    async fn toggle_snippet_public(&self, snippet_id: i64) -> Result<Snippet> {
        let mut snippets = self.snippets.write();
        let snippet = snippets
            .get_mut(&snippet_id)
            .ok_or_else(|| StorageError::snippet_not_found(snippet_id))?;
        snippet.is_public = !snippet.is_public;
        if snippet.is_public && snippet.share_id.is_none() {
            snippet.share_id = Some(new_share_id());
        }
        snippet.updated_at = Utc::now();
        Ok(snippet.clone())
    }

    async fn get_snippet_comments(&self, snippet_id: i64) -> Result<Vec<Comment>> {
        let mut out: Vec<Comment> = self
            .comments
            .read()
            .values()
            .filter(|c| c.snippet_id == snippet_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn create_comment(&self, draft: &NewComment) -> Result<Comment> {
        draft.validate()?;
        if !self.snippets.read().contains_key(&draft.snippet_id) {
            return Err(StorageError::snippet_not_found(draft.snippet_id));
        }
        let now = Utc::now();
        let comment = Comment {
            id: self.next_comment_id.fetch_add(1, Ordering::SeqCst),
            snippet_id: draft.snippet_id,
            content: draft.content.clone(),
            author_name: draft.author_name.clone(),
            user_id: draft.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.comments.write().insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(StorageError::validation(
                "comment content must not be empty",
            ));
        }
        let mut comments = self.comments.write();
        let comment = comments
            .get_mut(&id)
            .ok_or_else(|| StorageError::comment_not_found(id))?;
        comment.content = content.to_string();
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<()> {
        if self.comments.write().remove(&id).is_none() {
            return Err(StorageError::comment_not_found(id));
        }
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_users: self.users.read().len(),
            total_snippets: self.snippets.read().len(),
            total_collections: self.collections.read().len(),
            total_collection_items: self.collection_items.read().len(),
            total_comments: self.comments.read().len(),
        })
    }
}
