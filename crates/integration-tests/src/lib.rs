//! Shared fixtures for the cross-crate tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use domains::{
    Category, Comment, Counter, DomainError, DomainResult, Entry, EntryPatch, EntryQuery, EntryStore,
    NotificationSink, Severity,
};
use storage_adapters::MemoryEntryStore;

/// Public entry created on `2024-01-<day>` at `hour`:00 UTC.
pub fn public_entry(id: &str, content: &str, day: u32, hour: u32) -> Entry {
    let mut entry = Entry::new(id, content, Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap());
    entry.is_public = true;
    entry
}

/// `count` public entries `p01..`, one hour apart, newest last.
pub fn numbered_entries(count: u32) -> Vec<Entry> {
    (1..=count).map(|n| public_entry(&format!("p{n:02}"), &format!("post number {n}"), 1 + n / 24, n % 24)).collect()
}

/// Wraps a [`MemoryEntryStore`] with scripted outages, an optional
/// suspension point and a query counter.
pub struct ScriptedStore {
    inner: MemoryEntryStore,
    failures_left: AtomicU32,
    queries: AtomicU32,
    suspend: AtomicBool,
}

impl ScriptedStore {
    pub fn new(inner: MemoryEntryStore) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(0),
            queries: AtomicU32::new(0),
            suspend: AtomicBool::new(false),
        }
    }

    /// The next `n` queries fail with a transient error.
    pub fn failing(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Every query yields once before answering, so it is observably in flight.
    pub fn suspending(self) -> Self {
        self.suspend.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryEntryStore {
        &self.inner
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EntryStore for ScriptedStore {
    async fn query_entries(&self, query: &EntryQuery) -> DomainResult<Vec<Entry>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.suspend.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.take_failure() {
            return Err(DomainError::Transient("scripted outage".into()));
        }
        self.inner.query_entries(query).await
    }

    async fn insert_entry(&self, entry: Entry) -> DomainResult<Entry> {
        self.inner.insert_entry(entry).await
    }

    async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()> {
        self.inner.update_entry(id, patch).await
    }

    async fn delete_entry(&self, id: &str) -> DomainResult<()> {
        self.inner.delete_entry(id).await
    }

    async fn increment_counter(&self, id: &str, counter: Counter) -> DomainResult<u64> {
        if self.suspend.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.inner.increment_counter(id, counter).await
    }

    async fn list_comments(&self, entry_id: &str) -> DomainResult<Vec<Comment>> {
        self.inner.list_comments(entry_id).await
    }

    async fn insert_comment(&self, comment: Comment) -> DomainResult<Comment> {
        self.inner.insert_comment(comment).await
    }

    async fn list_categories(&self) -> DomainResult<Vec<Category>> {
        self.inner.list_categories().await
    }
}

/// Keeps every message it is shown.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages().iter().filter(|(m, _)| m == message).count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn display(&self, message: &str, severity: Severity) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((message.to_string(), severity));
        }
    }
}
