//! Behavioral contract suite.
//!
//! Every scenario runs against both backends; the in-memory store is
//! the oracle the SQLite store is held to. Filter equivalence compares
//! the two directly over an identical dataset.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use snipvault_storage::{
    ErrorKind, InMemorySnippetStore, NewCollection, NewComment, NewSnippet, NewUser,
    SnippetFilter, SnippetStore,
};

#[cfg(feature = "sqlite")]
use snipvault_storage::SqliteSnippetStore;

fn stores() -> Vec<(&'static str, Arc<dyn SnippetStore>)> {
    let mut stores: Vec<(&'static str, Arc<dyn SnippetStore>)> =
        vec![("memory", Arc::new(InMemorySnippetStore::new()))];
    #[cfg(feature = "sqlite")]
    stores.push(("sqlite", Arc::new(SqliteSnippetStore::in_memory().unwrap())));
    stores
}

fn draft(
    title: &str,
    code: &str,
    language: &str,
    tags: &[&str],
    user_id: Option<&str>,
) -> NewSnippet {
    NewSnippet {
        title: title.into(),
        description: None,
        code: code.into(),
        language: language.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        user_id: user_id.map(|u| u.to_string()),
    }
}

/// Identical dataset for both backends: five snippets across four
/// languages and two owners, two favorites, two public.
async fn seed(store: &Arc<dyn SnippetStore>) -> Vec<i64> {
    store
        .upsert_user(&NewUser {
            id: "u1".into(),
            email: Some("u1@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .upsert_user(&NewUser {
            id: "u2".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut ids = Vec::new();
    ids.push(
        store
            .create_snippet(&draft(
                "Quicksort in Rust",
                "fn quicksort(v: &mut [i32]) {}",
                "rust",
                &["algorithms", "sorting"],
                Some("u1"),
            ))
            .await
            .unwrap()
            .id,
    );
    ids.push(
        store
            .create_snippet(&draft(
                "HTTP server in Go",
                "func main() { http.ListenAndServe(\":8080\", nil) }",
                "go",
                &["web", "http"],
                Some("u1"),
            ))
            .await
            .unwrap()
            .id,
    );
    ids.push(
        store
            .create_snippet(&NewSnippet {
                description: Some("minimal web app".into()),
                ..draft(
                    "Flask hello",
                    "from flask import Flask",
                    "python",
                    &["web"],
                    Some("u2"),
                )
            })
            .await
            .unwrap()
            .id,
    );
    ids.push(
        store
            .create_snippet(&draft(
                "Binary search",
                "def bsearch(xs, x): pass",
                "python",
                &["algorithms"],
                None,
            ))
            .await
            .unwrap()
            .id,
    );
    ids.push(
        store
            .create_snippet(&draft(
                "CSS reset",
                "* { margin: 0; padding: 0; }",
                "css",
                &[],
                Some("u2"),
            ))
            .await
            .unwrap()
            .id,
    );

    store.toggle_snippet_favorite(ids[0]).await.unwrap();
    store.toggle_snippet_favorite(ids[2]).await.unwrap();
    store.toggle_snippet_public(ids[1]).await.unwrap();
    store.toggle_snippet_public(ids[3]).await.unwrap();

    ids
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snippet CRUD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_snippet_defaults_and_crud() {
    for (name, store) in stores() {
        let created = store
            .create_snippet(&draft("X", "print(1)", "python", &["tag"], None))
            .await
            .unwrap();
        assert_eq!(created.view_count, 0, "{name}");
        assert!(!created.is_favorite, "{name}");
        assert!(!created.is_public, "{name}");
        assert!(created.share_id.is_none(), "{name}");
        assert_eq!(created.created_at, created.updated_at, "{name}");

        let fetched = store.get_snippet(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created, "{name}");

        tokio::time::sleep(Duration::from_millis(5)).await;
        let updated = store
            .update_snippet(
                created.id,
                &NewSnippet {
                    description: Some("renamed".into()),
                    ..draft("Y", "print(2)", "python", &["other"], Some("u9"))
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Y", "{name}");
        assert_eq!(updated.description.as_deref(), Some("renamed"), "{name}");
        assert_eq!(updated.tags, vec!["other".to_string()], "{name}");
        assert_eq!(updated.user_id.as_deref(), Some("u9"), "{name}");
        assert_eq!(updated.created_at, created.created_at, "{name}");
        assert!(updated.updated_at > created.updated_at, "{name}");

        store.delete_snippet(created.id).await.unwrap();
        assert!(store.get_snippet(created.id).await.unwrap().is_none(), "{name}");

        let err = store
            .update_snippet(created.id, &draft("Z", "z", "python", &[], None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");
    }
}

#[tokio::test]
async fn test_tags_are_normalized_on_write() {
    for (name, store) in stores() {
        let created = store
            .create_snippet(&draft(
                "Tagged",
                "x",
                "go",
                &[" cli ", "cli", "", "web"],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(created.tags, vec!["cli".to_string(), "web".to_string()], "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Filter composition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The primary correctness contract: for any filter combination over
/// identical data, both backends return the same id set. Ordering is
/// verified separately.
#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_filter_equivalence_between_backends() {
    let memory: Arc<dyn SnippetStore> = Arc::new(InMemorySnippetStore::new());
    let sqlite: Arc<dyn SnippetStore> = Arc::new(SqliteSnippetStore::in_memory().unwrap());
    let memory_ids = seed(&memory).await;
    let sqlite_ids = seed(&sqlite).await;
    assert_eq!(memory_ids, sqlite_ids);

    let searches: [Option<&str>; 4] = [None, Some("web"), Some("QUICK"), Some("flask")];
    let languages: [&[&str]; 4] = [&[], &["python"], &["go", "python"], &["rust", "css"]];
    let tags: [&[&str]; 4] = [&[], &["web"], &["algorithms", "http"], &["nope"]];
    let favorites = [false, true];
    let publics = [None, Some(true), Some(false)];
    let users: [Option<&str>; 3] = [None, Some("u1"), Some("u2")];

    let mut checked = 0usize;
    for search in searches {
        for language in languages {
            for tag in tags {
                for favorite in favorites {
                    for public in publics {
                        for user in users {
                            let filter = SnippetFilter {
                                search: search.map(Into::into),
                                languages: language.iter().map(|s| s.to_string()).collect(),
                                tags: tag.iter().map(|s| s.to_string()).collect(),
                                favorites: favorite,
                                is_public: public,
                                user_id: user.map(Into::into),
                            };
                            let mut from_memory: Vec<i64> = memory
                                .get_snippets(&filter)
                                .await
                                .unwrap()
                                .iter()
                                .map(|s| s.id)
                                .collect();
                            let mut from_sqlite: Vec<i64> = sqlite
                                .get_snippets(&filter)
                                .await
                                .unwrap()
                                .iter()
                                .map(|s| s.id)
                                .collect();
                            from_memory.sort_unstable();
                            from_sqlite.sort_unstable();
                            assert_eq!(from_memory, from_sqlite, "filter: {filter:?}");
                            checked += 1;
                        }
                    }
                }
            }
        }
    }
    assert_eq!(checked, 4 * 4 * 4 * 2 * 3 * 3);
}

#[tokio::test]
async fn test_language_list_returns_union() {
    for (name, store) in stores() {
        let ids = seed(&store).await;
        let hits = store
            .get_snippets(&SnippetFilter {
                languages: vec!["go".into(), "python".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        let mut got: Vec<i64> = hits.iter().map(|s| s.id).collect();
        got.sort_unstable();
        // go + both python snippets, never the (empty) intersection
        assert_eq!(got, vec![ids[1], ids[2], ids[3]], "{name}");
    }
}

#[tokio::test]
async fn test_tag_list_returns_union() {
    for (name, store) in stores() {
        let ids = seed(&store).await;
        let hits = store
            .get_snippets(&SnippetFilter {
                tags: vec!["sorting".into(), "http".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        let mut got: Vec<i64> = hits.iter().map(|s| s.id).collect();
        got.sort_unstable();
        assert_eq!(got, vec![ids[0], ids[1]], "{name}");
    }
}

#[tokio::test]
async fn test_search_spans_title_description_and_code() {
    for (name, store) in stores() {
        let ids = seed(&store).await;

        // title hit, case-insensitive
        let by_title = store
            .get_snippets(&SnippetFilter {
                search: Some("qUiCkSoRt".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            by_title.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![ids[0]],
            "{name}"
        );

        // description-only hit
        let by_description = store
            .get_snippets(&SnippetFilter {
                search: Some("minimal".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            by_description.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![ids[2]],
            "{name}"
        );

        // code-only hit
        let by_code = store
            .get_snippets(&SnippetFilter {
                search: Some("ListenAndServe".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            by_code.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![ids[1]],
            "{name}"
        );

        // LIKE wildcards in the needle match literally, not as wildcards
        let wildcard = store
            .get_snippets(&SnippetFilter {
                search: Some("%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(wildcard.is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_and_composition_across_criteria() {
    for (name, store) in stores() {
        let ids = seed(&store).await;
        let hits = store
            .get_snippets(&SnippetFilter {
                search: Some("web".into()),
                languages: vec!["python".into(), "go".into()],
                user_id: Some("u2".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            hits.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![ids[2]],
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_ordering_most_recently_updated_first() {
    for (name, store) in stores() {
        let a = store
            .create_snippet(&draft("A", "a", "rust", &[], None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let b = store
            .create_snippet(&draft("B", "b", "rust", &[], None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let c = store
            .create_snippet(&draft("C", "c", "rust", &[], None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // touching A moves it to the front
        store
            .update_snippet(a.id, &draft("A2", "a", "rust", &[], None))
            .await
            .unwrap();

        let order: Vec<i64> = store
            .get_snippets(&SnippetFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![a.id, c.id, b.id], "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cascades
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_snippet_delete_cascades_memberships_and_comments() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Doomed", "x", "go", &[], None))
            .await
            .unwrap();
        let keeper = store
            .create_snippet(&draft("Keeper", "y", "go", &[], None))
            .await
            .unwrap();
        let collection = store
            .create_collection(&NewCollection {
                name: "Mixed".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .add_snippet_to_collection(collection.id, snippet.id)
            .await
            .unwrap();
        store
            .add_snippet_to_collection(collection.id, keeper.id)
            .await
            .unwrap();
        store
            .create_comment(&NewComment {
                snippet_id: snippet.id,
                content: "nice".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        store.delete_snippet(snippet.id).await.unwrap();

        let remaining: Vec<i64> = store
            .get_collection_snippets(collection.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(remaining, vec![keeper.id], "{name}");
        assert!(
            store
                .get_snippet_comments(snippet.id)
                .await
                .unwrap()
                .is_empty(),
            "{name}"
        );

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_collection_items, 1, "{name}");
        assert_eq!(stats.total_comments, 0, "{name}");
    }
}

#[tokio::test]
async fn test_collection_delete_cascades_memberships_only() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Survivor", "x", "go", &[], None))
            .await
            .unwrap();
        let collection = store
            .create_collection(&NewCollection {
                name: "Doomed".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .add_snippet_to_collection(collection.id, snippet.id)
            .await
            .unwrap();

        store.delete_collection(collection.id).await.unwrap();

        assert!(store.get_collection(collection.id).await.unwrap().is_none(), "{name}");
        assert!(store.get_snippet(snippet.id).await.unwrap().is_some(), "{name}");
        assert_eq!(store.get_stats().await.unwrap().total_collection_items, 0, "{name}");

        let err = store
            .get_collection_snippets(collection.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionNotFound, "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sharing state machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_publish_toggle_walkthrough() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("X", "print(1)", "python", &[], None))
            .await
            .unwrap();
        assert_eq!(snippet.view_count, 0, "{name}");
        assert!(!snippet.is_favorite && !snippet.is_public, "{name}");
        assert!(snippet.share_id.is_none(), "{name}");

        let published = store.toggle_snippet_public(snippet.id).await.unwrap();
        assert!(published.is_public, "{name}");
        let token = published.share_id.clone().expect("publish mints a token");
        assert_eq!(token.chars().count(), 8, "{name}");

        let via_token = store
            .get_snippet_by_share_id(&token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(via_token.id, snippet.id, "{name}");

        let unpublished = store.toggle_snippet_public(snippet.id).await.unwrap();
        assert!(!unpublished.is_public, "{name}");
        assert_eq!(unpublished.share_id.as_deref(), Some(token.as_str()), "{name}");

        // the link keeps resolving while private; visibility policy is
        // the caller's concern
        assert!(
            store
                .get_snippet_by_share_id(&token)
                .await
                .unwrap()
                .is_some(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_share_request_is_stable_and_does_not_publish() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Linked", "x", "go", &[], None))
            .await
            .unwrap();

        let token = store.generate_share_id(snippet.id).await.unwrap();
        assert_eq!(token.chars().count(), 8, "{name}");

        let fetched = store.get_snippet(snippet.id).await.unwrap().unwrap();
        assert!(!fetched.is_public, "{name}");
        assert_eq!(fetched.share_id.as_deref(), Some(token.as_str()), "{name}");

        // repeat requests return the same token, never a rotation
        assert_eq!(store.generate_share_id(snippet.id).await.unwrap(), token, "{name}");

        // publishing an already-tokened snippet keeps the token
        let published = store.toggle_snippet_public(snippet.id).await.unwrap();
        assert_eq!(published.share_id.as_deref(), Some(token.as_str()), "{name}");
        assert_eq!(store.generate_share_id(snippet.id).await.unwrap(), token, "{name}");
    }
}

#[tokio::test]
async fn test_share_lookup_misses_return_none() {
    for (name, store) in stores() {
        seed(&store).await;
        assert!(
            store
                .get_snippet_by_share_id("no-such-1")
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Counters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_favorite_double_toggle_restores_state() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Fav", "x", "go", &[], None))
            .await
            .unwrap();
        let once = store.toggle_snippet_favorite(snippet.id).await.unwrap();
        assert!(once.is_favorite, "{name}");
        let twice = store.toggle_snippet_favorite(snippet.id).await.unwrap();
        assert_eq!(twice.is_favorite, snippet.is_favorite, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_view_count_increments_are_exact() {
    const WRITERS: usize = 25;
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Hot", "x", "go", &[], None))
            .await
            .unwrap();

        let mut handles = Vec::with_capacity(WRITERS);
        for _ in 0..WRITERS {
            let store = store.clone();
            let id = snippet.id;
            handles.push(tokio::spawn(async move {
                store.increment_snippet_view_count(id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let counted = store.get_snippet(snippet.id).await.unwrap().unwrap();
        assert_eq!(counted.view_count, WRITERS as i64, "{name}");
    }
}

#[tokio::test]
async fn test_view_count_does_not_disturb_recency_order() {
    for (name, store) in stores() {
        let a = store
            .create_snippet(&draft("A", "a", "rust", &[], None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let b = store
            .create_snippet(&draft("B", "b", "rust", &[], None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        store.increment_snippet_view_count(a.id).await.unwrap();

        let order: Vec<i64> = store
            .get_snippets(&SnippetFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![b.id, a.id], "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collection membership
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_membership_pair_is_unique() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Member", "x", "go", &[], None))
            .await
            .unwrap();
        let collection = store
            .create_collection(&NewCollection {
                name: "Favs".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let item = store
            .add_snippet_to_collection(collection.id, snippet.id)
            .await
            .unwrap();
        assert_eq!(item.collection_id, collection.id, "{name}");
        assert_eq!(item.snippet_id, snippet.id, "{name}");

        let err = store
            .add_snippet_to_collection(collection.id, snippet.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict, "{name}");
        assert_eq!(
            store.get_collection_snippets(collection.id).await.unwrap().len(),
            1,
            "{name}"
        );

        store
            .remove_snippet_from_collection(collection.id, snippet.id)
            .await
            .unwrap();
        let err = store
            .remove_snippet_from_collection(collection.id, snippet.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionItemNotFound, "{name}");
    }
}

#[tokio::test]
async fn test_membership_requires_both_sides() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Lonely", "x", "go", &[], None))
            .await
            .unwrap();
        let collection = store
            .create_collection(&NewCollection {
                name: "Real".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = store
            .add_snippet_to_collection(9999, snippet.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionNotFound, "{name}");

        let err = store
            .add_snippet_to_collection(collection.id, 9999)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");
    }
}

#[tokio::test]
async fn test_collection_snippets_preserve_membership_order() {
    for (name, store) in stores() {
        let ids = seed(&store).await;
        let collection = store
            .create_collection(&NewCollection {
                name: "Ordered".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        // add in non-id order; listing follows membership creation
        for snippet_id in [ids[2], ids[0], ids[4]] {
            store
                .add_snippet_to_collection(collection.id, snippet_id)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let listed: Vec<i64> = store
            .get_collection_snippets(collection.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![ids[2], ids[0], ids[4]], "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Unified raise policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_operations_on_missing_ids_raise_not_found() {
    for (name, store) in stores() {
        let err = store.increment_snippet_view_count(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");
        assert!(err.is_not_found(), "{name}");

        let err = store.toggle_snippet_favorite(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");

        let err = store.toggle_snippet_public(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");

        let err = store.generate_share_id(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");

        let err = store.delete_snippet(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");

        let err = store
            .update_collection(
                9999,
                &NewCollection {
                    name: "X".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionNotFound, "{name}");

        let err = store.delete_collection(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionNotFound, "{name}");

        let err = store.update_comment(9999, "hi").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CommentNotFound, "{name}");

        let err = store.delete_comment(9999).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CommentNotFound, "{name}");

        let err = store
            .create_comment(&NewComment {
                snippet_id: 9999,
                content: "orphan".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SnippetNotFound, "{name}");
    }
}

#[tokio::test]
async fn test_validation_failures() {
    for (name, store) in stores() {
        let err = store
            .create_snippet(&draft("  ", "x", "go", &[], None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{name}");

        let err = store
            .create_collection(&NewCollection {
                name: String::new(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{name}");

        let err = store
            .create_user(&NewUser {
                id: " ".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Users
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_user_upsert_is_idempotent_by_id() {
    for (name, store) in stores() {
        let first = store
            .upsert_user(&NewUser {
                id: "auth0|abc".into(),
                email: Some("old@example.com".into()),
                name: Some("Ada".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store
            .upsert_user(&NewUser {
                id: "auth0|abc".into(),
                email: Some("new@example.com".into()),
                name: Some("Ada".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at, "{name}");
        assert!(second.updated_at > first.updated_at, "{name}");
        assert_eq!(second.email.as_deref(), Some("new@example.com"), "{name}");

        let by_email = store
            .get_user_by_email("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, "auth0|abc", "{name}");
        assert!(
            store
                .get_user_by_email("old@example.com")
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );

        let err = store
            .create_user(&NewUser {
                id: "auth0|abc".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict, "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Vocabulary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_languages_and_tags_are_distinct_and_sorted() {
    for (name, store) in stores() {
        seed(&store).await;
        assert_eq!(
            store.get_languages().await.unwrap(),
            vec!["css", "go", "python", "rust"],
            "{name}"
        );
        assert_eq!(
            store.get_tags().await.unwrap(),
            vec!["algorithms", "http", "sorting", "web"],
            "{name}"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Comments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_comments_list_ascending_by_creation() {
    for (name, store) in stores() {
        let snippet = store
            .create_snippet(&draft("Discussed", "x", "go", &[], None))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for text in ["first", "second", "third"] {
            ids.push(
                store
                    .create_comment(&NewComment {
                        snippet_id: snippet.id,
                        content: text.into(),
                        author_name: Some("ada".into()),
                        ..Default::default()
                    })
                    .await
                    .unwrap()
                    .id,
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let listed = store.get_snippet_comments(snippet.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            ids,
            "{name}"
        );

        let edited = store.update_comment(ids[1], "second, edited").await.unwrap();
        assert_eq!(edited.content, "second, edited", "{name}");
        assert!(edited.updated_at > edited.created_at, "{name}");

        store.delete_comment(ids[0]).await.unwrap();
        let listed = store.get_snippet_comments(snippet.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![ids[1], ids[2]],
            "{name}"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collections
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_collections_owner_filter_and_crud() {
    for (name, store) in stores() {
        let mine = store
            .create_collection(&NewCollection {
                name: "Mine".into(),
                user_id: Some("u1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .create_collection(&NewCollection {
                name: "Theirs".into(),
                user_id: Some("u2".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .create_collection(&NewCollection {
                name: "Seed".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(store.get_collections(None).await.unwrap().len(), 3, "{name}");
        let owned = store.get_collections(Some("u1")).await.unwrap();
        assert_eq!(
            owned.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![mine.id],
            "{name}"
        );

        let renamed = store
            .update_collection(
                mine.id,
                &NewCollection {
                    name: "Mine, renamed".into(),
                    description: Some("now with notes".into()),
                    user_id: Some("u1".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Mine, renamed", "{name}");
        assert_eq!(renamed.created_at, mine.created_at, "{name}");

        store.delete_collection(mine.id).await.unwrap();
        assert!(store.get_collection(mine.id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_stats_track_every_entity() {
    for (name, store) in stores() {
        seed(&store).await;
        let collection = store
            .create_collection(&NewCollection {
                name: "Counted".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .add_snippet_to_collection(collection.id, 1)
            .await
            .unwrap();
        store
            .create_comment(&NewComment {
                snippet_id: 1,
                content: "counted".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_users, 2, "{name}");
        assert_eq!(stats.total_snippets, 5, "{name}");
        assert_eq!(stats.total_collections, 1, "{name}");
        assert_eq!(stats.total_collection_items, 1, "{name}");
        assert_eq!(stats.total_comments, 1, "{name}");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SQLite persistence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");

    let (id, token) = {
        let store = SqliteSnippetStore::new(&path).unwrap();
        let snippet = store
            .create_snippet(&draft("Persisted", "x", "go", &["disk"], None))
            .await
            .unwrap();
        let token = store.generate_share_id(snippet.id).await.unwrap();
        (snippet.id, token)
    };

    let store = SqliteSnippetStore::new(&path).unwrap();
    let snippet = store.get_snippet(id).await.unwrap().unwrap();
    assert_eq!(snippet.title, "Persisted");
    assert_eq!(snippet.tags, vec!["disk".to_string()]);
    assert_eq!(snippet.share_id.as_deref(), Some(token.as_str()));
}
