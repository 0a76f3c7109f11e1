//! The client-side projection over a newest-first load must agree with
//! what the store answers for the same search and sort.

use chrono::{TimeZone, Utc};
use domains::{project, Entry, EntryQuery, EntryStore, SortDirection, SortKey, SortSpec};
use storage_adapters::MemoryEntryStore;

fn entry(id: &str, content: &str, author: Option<&str>, hour: u32, likes: u64, views: u64, public: bool) -> Entry {
    let mut e = Entry::new(id, content, Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap());
    e.user_id = author.map(str::to_string);
    e.likes = likes;
    e.views = views;
    e.is_public = public;
    e
}

/// Ties on every sortable field, including identical timestamps.
fn corpus() -> Vec<Entry> {
    vec![
        entry("e1", "Hello world", Some("alice"), 9, 5, 10, true),
        entry("e2", "quiet morning", Some("bob"), 9, 5, 3, true),
        entry("e3", "say HELLO again", None, 11, 0, 10, false),
        entry("e4", "nothing much", Some("hello-kitty"), 7, 12, 0, true),
        entry("e5", "rainy day", Some("alice"), 11, 5, 3, true),
        entry("e6", "othello notes", Some("carol"), 8, 1, 1, false),
        entry("e7", "", None, 10, 0, 0, true),
    ]
}

fn sorts() -> Vec<SortSpec> {
    let mut specs = Vec::new();
    for key in [SortKey::Date, SortKey::Likes, SortKey::Views] {
        for direction in [SortDirection::Desc, SortDirection::Asc] {
            specs.push(SortSpec::new(key, direction));
        }
    }
    specs
}

const SEARCHES: [&str; 6] = ["", "hello", "  HeLLo ", "alice", "zzz", "o"];

async fn assert_equivalent(store: &MemoryEntryStore, base_query: EntryQuery) {
    let loaded = store.query_entries(&base_query).await.unwrap();

    for sort in sorts() {
        for search in SEARCHES {
            let from_store: Vec<String> = store
                .query_entries(&base_query.clone().with_search(search).with_sort(sort))
                .await
                .unwrap()
                .into_iter()
                .map(|e| e.id)
                .collect();
            let projected: Vec<&str> = project(&loaded, search, sort).into_iter().map(|e| e.id.as_str()).collect();

            assert_eq!(projected, from_store, "sort {sort:?}, search {search:?}");
        }
    }
}

#[tokio::test]
async fn test_projection_matches_store_over_all_entries() {
    let store = MemoryEntryStore::with_entries(corpus());
    assert_equivalent(&store, EntryQuery::all()).await;
}

#[tokio::test]
async fn test_projection_matches_store_over_public_entries() {
    let store = MemoryEntryStore::with_entries(corpus());
    assert_equivalent(&store, EntryQuery { visibility: Some(true), ..EntryQuery::all() }).await;
}

#[tokio::test]
async fn test_search_matches_content_or_author() {
    let store = MemoryEntryStore::with_entries(corpus());
    let loaded = store.query_entries(&EntryQuery::all()).await.unwrap();

    let hits: Vec<&str> = project(&loaded, "hello", SortSpec::default()).into_iter().map(|e| e.id.as_str()).collect();
    assert_eq!(hits, vec!["e3", "e1", "e6", "e4"]);
}

#[test]
fn test_hello_search_scenario() {
    let loaded = vec![
        entry("x", "Hello world", None, 12, 0, 0, true),
        entry("y", "bye", Some("Othello"), 11, 0, 0, true),
        entry("z", "nothing", None, 10, 0, 0, true),
    ];

    let hits: Vec<&str> = project(&loaded, "hello", SortSpec::new(SortKey::Date, SortDirection::Desc))
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(hits, vec!["x", "y"]);
}
