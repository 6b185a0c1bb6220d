//! SQLite Snippet Store
//!
//! File-based persistent storage using SQLite. The tag set is persisted
//! as a JSON text column and queried with `json_each`; timestamps are
//! persisted as Unix epoch milliseconds.
//!
//! Referential cleanup is explicit: deleting a snippet or a collection
//! removes its child rows in the same transaction rather than relying on
//! FK cascade enforcement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::models::{
    new_share_id, Collection, CollectionItem, Comment, NewCollection, NewComment, NewSnippet,
    NewUser, Snippet, User,
};
use crate::domain::ports::{SnippetFilter, SnippetStore, StorageStats};
use crate::error::{Result, StorageError};

const SNIPPET_COLUMNS: &str = "id, title, description, code, language, tags, user_id, \
     view_count, is_favorite, is_public, share_id, created_at, updated_at";

const COLLECTION_COLUMNS: &str = "id, name, description, user_id, created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, snippet_id, content, author_name, user_id, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, name, avatar_url, created_at, updated_at";

/// SQLite-based SnippetStore implementation
#[derive(Clone)]
pub struct SqliteSnippetStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnippetStore {
    /// Create a new SQLite store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // The bundled SQLite is compiled with SQLITE_DEFAULT_FOREIGN_KEYS=1,
        // which enables foreign-key enforcement — contrary to SQLite's
        // documented default (OFF). Referential cleanup here is handled at the
        // application level via explicit child-table cascade deletes, so keep
        // the documented default and leave enforcement off.
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                name TEXT,
                avatar_url TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                code TEXT NOT NULL,
                language TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                user_id TEXT,
                view_count INTEGER NOT NULL DEFAULT 0,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                is_public INTEGER NOT NULL DEFAULT 0,
                share_id TEXT UNIQUE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snippets_user ON snippets(user_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snippets_language ON snippets(language)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snippets_updated ON snippets(updated_at)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                user_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collection_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection_id INTEGER NOT NULL,
                snippet_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (collection_id, snippet_id),
                FOREIGN KEY (collection_id) REFERENCES collections(id),
                FOREIGN KEY (snippet_id) REFERENCES snippets(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_items_snippet ON collection_items(snippet_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snippet_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                author_name TEXT,
                user_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (snippet_id) REFERENCES snippets(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_comments_snippet ON comments(snippet_id)",
            [],
        )?;

        tracing::debug!("snippet store schema initialized");
        Ok(())
    }
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn row_to_snippet(row: &Row<'_>) -> rusqlite::Result<Snippet> {
    let tags_json: String = row.get(5)?;
    Ok(Snippet {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        code: row.get(3)?,
        language: row.get(4)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        user_id: row.get(6)?,
        view_count: row.get(7)?,
        is_favorite: row.get(8)?,
        is_public: row.get(9)?,
        share_id: row.get(10)?,
        created_at: DateTime::from_timestamp_millis(row.get(11)?).unwrap_or_default(),
        updated_at: DateTime::from_timestamp_millis(row.get(12)?).unwrap_or_default(),
    })
}

fn row_to_collection(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        user_id: row.get(3)?,
        created_at: DateTime::from_timestamp_millis(row.get(4)?).unwrap_or_default(),
        updated_at: DateTime::from_timestamp_millis(row.get(5)?).unwrap_or_default(),
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        snippet_id: row.get(1)?,
        content: row.get(2)?,
        author_name: row.get(3)?,
        user_id: row.get(4)?,
        created_at: DateTime::from_timestamp_millis(row.get(5)?).unwrap_or_default(),
        updated_at: DateTime::from_timestamp_millis(row.get(6)?).unwrap_or_default(),
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        avatar_url: row.get(3)?,
        created_at: DateTime::from_timestamp_millis(row.get(4)?).unwrap_or_default(),
        updated_at: DateTime::from_timestamp_millis(row.get(5)?).unwrap_or_default(),
    })
}

fn exists(conn: &Connection, sql: &str, params: impl Params) -> Result<bool> {
    let found: Option<i64> = conn.query_row(sql, params, |row| row.get(0)).optional()?;
    Ok(found.is_some())
}

fn snippet_by_id(conn: &Connection, id: i64) -> Result<Option<Snippet>> {
    let sql = format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], row_to_snippet)
        .optional()?)
}

fn collection_by_id(conn: &Connection, id: i64) -> Result<Option<Collection>> {
    let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], row_to_collection)
        .optional()?)
}

fn comment_by_id(conn: &Connection, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], row_to_comment)
        .optional()?)
}

fn user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_user).optional()?)
}

/// Escape LIKE wildcards so a search needle matches literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Assemble the WHERE clause for a snippet filter.
///
/// One clause per criterion, AND-composed; returns the clause string
/// (with a leading " WHERE", or empty) and the bind values in clause
/// order. Kept free of the trait impl so the composition is testable
/// without a database.
fn build_filter_sql(filter: &SnippetFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();

    if let Some(search) = filter.search.as_deref() {
        if !search.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.to_ascii_lowercase()));
            clauses.push(
                "(LOWER(title) LIKE ? ESCAPE '\\' \
                 OR LOWER(COALESCE(description, '')) LIKE ? ESCAPE '\\' \
                 OR LOWER(code) LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            for _ in 0..3 {
                binds.push(Value::Text(pattern.clone()));
            }
        }
    }

    if !filter.languages.is_empty() {
        let marks = vec!["?"; filter.languages.len()].join(", ");
        clauses.push(format!("language IN ({marks})"));
        binds.extend(filter.languages.iter().cloned().map(Value::Text));
    }

    if !filter.tags.is_empty() {
        let marks = vec!["?"; filter.tags.len()].join(", ");
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(snippets.tags) \
             WHERE json_each.value IN ({marks}))"
        ));
        binds.extend(filter.tags.iter().cloned().map(Value::Text));
    }

    if filter.favorites {
        clauses.push("is_favorite = 1".to_string());
    }

    if let Some(is_public) = filter.is_public {
        clauses.push("is_public = ?".to_string());
        binds.push(Value::Integer(i64::from(is_public)));
    }

    if let Some(user_id) = filter.user_id.as_deref() {
        clauses.push("user_id = ?".to_string());
        binds.push(Value::Text(user_id.to_string()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, binds)
}

#[async_trait]
impl SnippetStore for SqliteSnippetStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        user_by_id(&conn, id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 LIMIT 1");
        Ok(conn
            .query_row(&sql, params![email], row_to_user)
            .optional()?)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        let conn = self.conn.lock().unwrap();
        if exists(&conn, "SELECT 1 FROM users WHERE id = ?1", params![user.id])? {
            return Err(StorageError::conflict(format!(
                "user '{}' already exists",
                user.id
            )));
        }
        let now = millis(Utc::now());
        conn.execute(
            "INSERT INTO users (id, email, name, avatar_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![&user.id, &user.email, &user.name, &user.avatar_url, now],
        )?;
        user_by_id(&conn, &user.id)?.ok_or_else(|| StorageError::user_not_found(&user.id))
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        let conn = self.conn.lock().unwrap();
        let now = millis(Utc::now());
        conn.execute(
            "INSERT INTO users (id, email, name, avatar_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 name = excluded.name,
                 avatar_url = excluded.avatar_url,
                 updated_at = excluded.updated_at",
            params![&user.id, &user.email, &user.name, &user.avatar_url, now],
        )?;
        user_by_id(&conn, &user.id)?.ok_or_else(|| StorageError::user_not_found(&user.id))
    }

    async fn get_snippets(&self, filter: &SnippetFilter) -> Result<Vec<Snippet>> {
        let (where_sql, binds) = build_filter_sql(filter);
        let sql = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets{where_sql} \
             ORDER BY updated_at DESC, id DESC"
        );
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let snippets = stmt
            .query_map(params_from_iter(binds), row_to_snippet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snippets)
    }

    async fn get_snippet(&self, id: i64) -> Result<Option<Snippet>> {
        let conn = self.conn.lock().unwrap();
        snippet_by_id(&conn, id)
    }

    async fn create_snippet(&self, draft: &NewSnippet) -> Result<Snippet> {
        draft.validate()?;
        let tags_json = serde_json::to_string(&draft.normalized_tags())?;
        let now = millis(Utc::now());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO snippets
                 (title, description, code, language, tags, user_id,
                  view_count, is_favorite, is_public, share_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 0, NULL, ?7, ?7)",
            params![
                &draft.title,
                &draft.description,
                &draft.code,
                &draft.language,
                tags_json,
                &draft.user_id,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        snippet_by_id(&conn, id)?.ok_or_else(|| StorageError::snippet_not_found(id))
    }

    async fn update_snippet(&self, id: i64, draft: &NewSnippet) -> Result<Snippet> {
        draft.validate()?;
        let tags_json = serde_json::to_string(&draft.normalized_tags())?;
        let now = millis(Utc::now());
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE snippets
             SET title = ?1, description = ?2, code = ?3, language = ?4,
                 tags = ?5, user_id = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                &draft.title,
                &draft.description,
                &draft.code,
                &draft.language,
                tags_json,
                &draft.user_id,
                now,
                id,
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::snippet_not_found(id));
        }
        snippet_by_id(&conn, id)?.ok_or_else(|| StorageError::snippet_not_found(id))
    }

    async fn delete_snippet(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StorageError::snippet_not_found(id));
        }
        let removed_items = tx.execute(
            "DELETE FROM collection_items WHERE snippet_id = ?1",
            params![id],
        )?;
        let removed_comments =
            tx.execute("DELETE FROM comments WHERE snippet_id = ?1", params![id])?;
        tx.commit()?;
        tracing::debug!(
            snippet_id = id,
            removed_items,
            removed_comments,
            "deleted snippet"
        );
        Ok(())
    }

    async fn increment_snippet_view_count(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Relative update: SQLite applies the +1 atomically, no
        // read-modify-write round trip.
        let rows = conn.execute(
            "UPDATE snippets SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Err(StorageError::snippet_not_found(id));
        }
        Ok(())
    }

    async fn toggle_snippet_favorite(&self, id: i64) -> Result<Snippet> {
        let now = millis(Utc::now());
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE snippets SET is_favorite = 1 - is_favorite, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        if rows == 0 {
            return Err(StorageError::snippet_not_found(id));
        }
        snippet_by_id(&conn, id)?.ok_or_else(|| StorageError::snippet_not_found(id))
    }

    async fn get_languages(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT DISTINCT language FROM snippets ORDER BY language")?;
        let languages = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(languages)
    }

    async fn get_tags(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT je.value FROM snippets, json_each(snippets.tags) AS je \
             ORDER BY je.value",
        )?;
        let tags = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    async fn get_collections(&self, user_id: Option<&str>) -> Result<Vec<Collection>> {
        let conn = self.conn.lock().unwrap();
        let collections = match user_id {
            Some(owner) => {
                let sql = format!(
                    "SELECT {COLLECTION_COLUMNS} FROM collections WHERE user_id = ?1 \
                     ORDER BY updated_at DESC, id DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![owner], row_to_collection)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {COLLECTION_COLUMNS} FROM collections \
                     ORDER BY updated_at DESC, id DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], row_to_collection)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(collections)
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let conn = self.conn.lock().unwrap();
        collection_by_id(&conn, id)
    }

    async fn create_collection(&self, draft: &NewCollection) -> Result<Collection> {
        draft.validate()?;
        let now = millis(Utc::now());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO collections (name, description, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![&draft.name, &draft.description, &draft.user_id, now],
        )?;
        let id = conn.last_insert_rowid();
        collection_by_id(&conn, id)?.ok_or_else(|| StorageError::collection_not_found(id))
    }

    async fn update_collection(&self, id: i64, draft: &NewCollection) -> Result<Collection> {
        draft.validate()?;
        let now = millis(Utc::now());
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE collections
             SET name = ?1, description = ?2, user_id = ?3, updated_at = ?4
             WHERE id = ?5",
            params![&draft.name, &draft.description, &draft.user_id, now, id],
        )?;
        if rows == 0 {
            return Err(StorageError::collection_not_found(id));
        }
        collection_by_id(&conn, id)?.ok_or_else(|| StorageError::collection_not_found(id))
    }

    async fn delete_collection(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StorageError::collection_not_found(id));
        }
        let removed_items = tx.execute(
            "DELETE FROM collection_items WHERE collection_id = ?1",
            params![id],
        )?;
        tx.commit()?;
        tracing::debug!(collection_id = id, removed_items, "deleted collection");
        Ok(())
    }

    async fn get_collection_snippets(&self, collection_id: i64) -> Result<Vec<Snippet>> {
        let conn = self.conn.lock().unwrap();
        if !exists(
            &conn,
            "SELECT 1 FROM collections WHERE id = ?1",
            params![collection_id],
        )? {
            return Err(StorageError::collection_not_found(collection_id));
        }
        let sql = "SELECT s.id, s.title, s.description, s.code, s.language, s.tags, s.user_id, \
                    s.view_count, s.is_favorite, s.is_public, s.share_id, \
                    s.created_at, s.updated_at \
             FROM snippets s \
             JOIN collection_items ci ON ci.snippet_id = s.id \
             WHERE ci.collection_id = ?1 \
             ORDER BY ci.created_at ASC, ci.id ASC";
        let mut stmt = conn.prepare(sql)?;
        let snippets = stmt
            .query_map(params![collection_id], row_to_snippet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snippets)
    }

    async fn add_snippet_to_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<CollectionItem> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        if !exists(
            &tx,
            "SELECT 1 FROM collections WHERE id = ?1",
            params![collection_id],
        )? {
            return Err(StorageError::collection_not_found(collection_id));
        }
        if !exists(
            &tx,
            "SELECT 1 FROM snippets WHERE id = ?1",
            params![snippet_id],
        )? {
            return Err(StorageError::snippet_not_found(snippet_id));
        }
        if exists(
            &tx,
            "SELECT 1 FROM collection_items WHERE collection_id = ?1 AND snippet_id = ?2",
            params![collection_id, snippet_id],
        )? {
            return Err(StorageError::conflict(format!(
                "snippet {} is already in collection {}",
                snippet_id, collection_id
            )));
        }
        let now = millis(Utc::now());
        tx.execute(
            "INSERT INTO collection_items (collection_id, snippet_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![collection_id, snippet_id, now],
        )?;
        let id = tx.last_insert_rowid();
        let item = tx
            .query_row(
                "SELECT id, collection_id, snippet_id, created_at \
                 FROM collection_items WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CollectionItem {
                        id: row.get(0)?,
                        collection_id: row.get(1)?,
                        snippet_id: row.get(2)?,
                        created_at: DateTime::from_timestamp_millis(row.get(3)?)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::collection_item_not_found(collection_id, snippet_id))?;
        tx.commit()?;
        Ok(item)
    }

    async fn remove_snippet_from_collection(
        &self,
        collection_id: i64,
        snippet_id: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM collection_items WHERE collection_id = ?1 AND snippet_id = ?2",
            params![collection_id, snippet_id],
        )?;
        if rows == 0 {
            return Err(StorageError::collection_item_not_found(
                collection_id,
                snippet_id,
            ));
        }
        Ok(())
    }

    async fn get_snippet_by_share_id(&self, share_id: &str) -> Result<Option<Snippet>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE share_id = ?1");
        Ok(conn
            .query_row(&sql, params![share_id], row_to_snippet)
            .optional()?)
    }

    async fn generate_share_id(&self, snippet_id: i64) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<Option<String>> = conn
            .query_row(
                "SELECT share_id FROM snippets WHERE id = ?1",
                params![snippet_id],
                |row| row.get(0),
            )
            .optional()?;
        let existing = existing.ok_or_else(|| StorageError::snippet_not_found(snippet_id))?;
        if let Some(token) = existing {
            return Ok(token);
        }
        let token = new_share_id();
        conn.execute(
            "UPDATE snippets SET share_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![&token, millis(Utc::now()), snippet_id],
        )?;
        Ok(token)
    }

    async fn toggle_snippet_public(&self, snippet_id: i64) -> Result<Snippet> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let state: Option<(bool, Option<String>)> = tx
            .query_row(
                "SELECT is_public, share_id FROM snippets WHERE id = ?1",
                params![snippet_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (is_public, share_id) =
            state.ok_or_else(|| StorageError::snippet_not_found(snippet_id))?;
        let now_public = !is_public;
        // Publishing mints a token when none exists; unpublishing keeps it.
        let share_id = match share_id {
            Some(token) => Some(token),
            None if now_public => Some(new_share_id()),
            None => None,
        };
        tx.execute(
            "UPDATE snippets SET is_public = ?1, share_id = ?2, updated_at = ?3 WHERE id = ?4",
            params![now_public, &share_id, millis(Utc::now()), snippet_id],
        )?;
        let snippet = snippet_by_id(&tx, snippet_id)?
            .ok_or_else(|| StorageError::snippet_not_found(snippet_id))?;
        tx.commit()?;
        Ok(snippet)
    }

    async fn get_snippet_comments(&self, snippet_id: i64) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE snippet_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let comments = stmt
            .query_map(params![snippet_id], row_to_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    async fn create_comment(&self, draft: &NewComment) -> Result<Comment> {
        draft.validate()?;
        let conn = self.conn.lock().unwrap();
        if !exists(
            &conn,
            "SELECT 1 FROM snippets WHERE id = ?1",
            params![draft.snippet_id],
        )? {
            return Err(StorageError::snippet_not_found(draft.snippet_id));
        }
        let now = millis(Utc::now());
        conn.execute(
            "INSERT INTO comments (snippet_id, content, author_name, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                draft.snippet_id,
                &draft.content,
                &draft.author_name,
                &draft.user_id,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        comment_by_id(&conn, id)?.ok_or_else(|| StorageError::comment_not_found(id))
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(StorageError::validation(
                "comment content must not be empty",
            ));
        }
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![content, millis(Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(StorageError::comment_not_found(id));
        }
        comment_by_id(&conn, id)?.ok_or_else(|| StorageError::comment_not_found(id))
    }

    async fn delete_comment(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StorageError::comment_not_found(id));
        }
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n as usize)
        };
        Ok(StorageStats {
            total_users: count("users")?,
            total_snippets: count("snippets")?,
            total_collections: count("collections")?,
            total_collection_items: count("collection_items")?,
            total_comments: count("comments")?,
        })
    }
}
