//! # MemoryEntryStore
//!
//! Concurrent in-process tables. Answers queries with the same filter,
//! ordering and range rules as the hosted store.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    Category, Comment, Counter, DomainError, DomainResult, Entry, EntryPatch, EntryQuery, EntryStore,
};
use tracing::debug;

#[derive(Default)]
pub struct MemoryEntryStore {
    entries: DashMap<String, Entry>,
    /// Keyed by entry id, kept in insertion order
    comments: DashMap<String, Vec<Comment>>,
    categories: DashMap<String, Category>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.entries.insert(entry.id.clone(), entry);
        }
        store
    }

    pub fn with_categories(self, categories: impl IntoIterator<Item = Category>) -> Self {
        for category in categories {
            self.categories.insert(category.id.clone(), category);
        }
        self
    }

    /// Current copy of one entry, bypassing queries.
    pub fn get(&self, id: &str) -> Option<Entry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn missing(id: &str) -> DomainError {
        DomainError::NotFound("Entry".into(), id.to_string())
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn query_entries(&self, query: &EntryQuery) -> DomainResult<Vec<Entry>> {
        let snapshot: Vec<Entry> = self.entries.iter().map(|e| e.value().clone()).collect();
        let hits = query.evaluate(&snapshot);
        debug!(total = snapshot.len(), returned = hits.len(), "memory query");
        Ok(hits)
    }

    async fn insert_entry(&self, entry: Entry) -> DomainResult<Entry> {
        if self.entries.contains_key(&entry.id) {
            return Err(DomainError::Validation(format!("entry {} already exists", entry.id)));
        }
        self.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()> {
        let mut entry = self.entries.get_mut(id).ok_or_else(|| Self::missing(id))?;
        patch.apply(&mut entry);
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> DomainResult<()> {
        self.entries.remove(id).ok_or_else(|| Self::missing(id))?;
        self.comments.remove(id);
        Ok(())
    }

    async fn increment_counter(&self, id: &str, counter: Counter) -> DomainResult<u64> {
        // The shard write lock makes read-add-write one step.
        let mut entry = self.entries.get_mut(id).ok_or_else(|| Self::missing(id))?;
        let value = entry.counter(counter).saturating_add(1);
        entry.set_counter(counter, value);
        Ok(value)
    }

    async fn list_comments(&self, entry_id: &str) -> DomainResult<Vec<Comment>> {
        Ok(self.comments.get(entry_id).map(|c| c.value().clone()).unwrap_or_default())
    }

    async fn insert_comment(&self, comment: Comment) -> DomainResult<Comment> {
        if !self.entries.contains_key(&comment.entry_id) {
            return Err(Self::missing(&comment.entry_id));
        }
        self.comments.entry(comment.entry_id.clone()).or_default().push(comment.clone());
        Ok(comment)
    }

    async fn list_categories(&self) -> DomainResult<Vec<Category>> {
        Ok(self.categories.iter().map(|c| c.value().clone()).collect())
    }
}
