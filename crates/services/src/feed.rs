//! # Public Feed Controller
//!
//! Sole owner of [`FeedState`]. Loads, pages, filters, sorts and retries the
//! public feed against an [`EntryStore`], and records likes, views and
//! comments on the entries it shows.
//!
//! # Developer Note
//! State lives in a `watch` channel so views can subscribe to it. Every
//! mutation goes through `send_modify`/`send_if_modified`, which keeps the
//! entry list swap atomic for observers. A generation counter tags each
//! replacing load; a completion whose generation is no longer current is
//! dropped instead of being applied to newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use backoff::backoff::Backoff as _;
use chrono::Utc;
use domains::{
    Comment, Counter, DomainError, DomainResult, Entry, EntryQuery, EntryStore, FeedFilters,
    NotificationSink, PageRange, SessionProvider, Severity, SharePayload, ShareTarget, SortKey,
};
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::retry::RetryPolicy;

pub const DEFAULT_PAGE_SIZE: usize = 10;

const MSG_FEED_FAILED: &str = "Failed to fetch public entries";
const MSG_LIKED: &str = "Liked!";
const MSG_LIKE_FAILED: &str = "Failed to like entry";
const MSG_COMMENT_ADDED: &str = "Comment added!";
const MSG_COMMENT_FAILED: &str = "Failed to add comment";
const MSG_SIGN_IN: &str = "Sign in required to comment";
const MSG_SHARED: &str = "Shared successfully!";
const MSG_SHARE_FAILED: &str = "Failed to share";

/// Everything the feed view renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Loaded entries in server page order
    pub entries: Vec<Entry>,
    /// Number of pages loaded so far; 0 before the first successful load
    pub page: u32,
    pub has_more: bool,
    pub loading: bool,
    /// Set once automatic retries are exhausted; cleared by the next success
    pub error: Option<DomainError>,
    /// Automatic retries performed in the current load cycle
    pub retry_count: u32,
    pub filters: FeedFilters,
}

impl FeedState {
    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

pub struct FeedController {
    store: Arc<dyn EntryStore>,
    notifier: Arc<dyn NotificationSink>,
    session: Arc<dyn SessionProvider>,
    policy: RetryPolicy,
    page_size: usize,
    state: watch::Sender<FeedState>,
    generation: AtomicU64,
    cancelled: Notify,
}

impl FeedController {
    pub fn new(
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn NotificationSink>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            store,
            notifier,
            session,
            policy: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            state,
            generation: AtomicU64::new(0),
            cancelled: Notify::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Starts a new generation and wakes every older load still in backoff.
    fn begin_generation(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancelled.notify_waiters();
        generation
    }

    /// Drops the loaded list and fetches page 1 with `filters`.
    ///
    /// Supersedes any load still in flight.
    pub async fn load_first_page(&self, filters: FeedFilters) -> DomainResult<()> {
        let generation = self.begin_generation();
        self.state.send_modify(|s| {
            s.entries.clear();
            s.page = 0;
            s.has_more = false;
            s.loading = true;
            s.error = None;
            s.retry_count = 0;
            s.filters = filters.clone();
        });
        debug!(generation, search = %filters.search, sort = %filters.sort.key, "loading first feed page");

        let query = EntryQuery::public_feed(&filters, PageRange::new(0, self.page_size));
        self.replace_with(generation, query, 1).await
    }

    /// Appends the next page. A no-op while any load is in flight or once
    /// the feed is exhausted.
    pub async fn load_next_page(&self) -> DomainResult<()> {
        let mut request = None;
        self.state.send_if_modified(|s| {
            if s.loading || !s.has_more || s.page == 0 {
                return false;
            }
            s.loading = true;
            s.error = None;
            s.retry_count = 0;
            request = Some((self.generation.load(Ordering::SeqCst), s.filters.clone(), s.page));
            true
        });
        let Some((generation, filters, loaded_pages)) = request else {
            debug!("next page skipped: load in flight or feed exhausted");
            return Ok(());
        };

        let offset = loaded_pages as usize * self.page_size;
        let query = EntryQuery::public_feed(&filters, PageRange::new(offset, self.page_size));
        match self.fetch_with_retry(generation, &query).await {
            Ok(Some(entries)) => {
                let count = entries.len();
                let page_size = self.page_size;
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    s.entries.extend(entries);
                    s.page += 1;
                    s.has_more = count == page_size;
                    s.loading = false;
                    s.error = None;
                    s.retry_count = 0;
                    true
                });
                if applied {
                    info!(count, page = loaded_pages + 1, "feed page appended");
                }
                Ok(())
            }
            Ok(None) => {
                debug!(generation, "superseded page load discarded");
                Ok(())
            }
            Err(err) => {
                self.fail(generation, &err);
                Err(err)
            }
        }
    }

    /// Picks a sort key: the active key flips direction, a new key starts descending.
    pub async fn set_sort(&self, key: SortKey) -> DomainResult<()> {
        let mut filters = self.state.borrow().filters.clone();
        filters.sort = filters.sort.toggled(key);
        self.load_first_page(filters).await
    }

    pub async fn set_category(&self, category: Option<String>) -> DomainResult<()> {
        let mut filters = self.state.borrow().filters.clone();
        filters.category = category.filter(|c| !c.is_empty());
        self.load_first_page(filters).await
    }

    pub async fn set_search(&self, search: impl Into<String>) -> DomainResult<()> {
        let mut filters = self.state.borrow().filters.clone();
        filters.search = search.into();
        self.load_first_page(filters).await
    }

    /// Manual retry after automatic retries gave up. Replays page 1 with
    /// the last filters and a fresh attempt budget.
    pub async fn retry(&self) -> DomainResult<()> {
        let filters = self.state.borrow().filters.clone();
        info!("manual feed retry");
        self.load_first_page(filters).await
    }

    /// Reloads every page loaded so far in one request, keeping the current
    /// list on screen until the new one arrives.
    pub async fn refresh(&self) -> DomainResult<()> {
        let generation = self.begin_generation();
        let (filters, pages) = {
            let s = self.state.borrow();
            (s.filters.clone(), s.page.max(1))
        };
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
            s.retry_count = 0;
        });

        let query = EntryQuery::public_feed(&filters, PageRange::leading(pages, self.page_size));
        self.replace_with(generation, query, pages).await
    }

    async fn replace_with(&self, generation: u64, query: EntryQuery, pages: u32) -> DomainResult<()> {
        let limit = query.range.map_or(self.page_size, |r| r.limit);
        match self.fetch_with_retry(generation, &query).await {
            Ok(Some(mut entries)) => {
                let count = entries.len();
                let applied = self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    carry_comments(&s.entries, &mut entries);
                    s.entries = entries;
                    s.page = pages;
                    s.has_more = count == limit;
                    s.loading = false;
                    s.error = None;
                    s.retry_count = 0;
                    true
                });
                if applied {
                    info!(count, pages, "feed loaded");
                }
                Ok(())
            }
            Ok(None) => {
                debug!(generation, "superseded feed load discarded");
                Ok(())
            }
            Err(err) => {
                self.fail(generation, &err);
                Err(err)
            }
        }
    }

    /// Runs `query` under the retry policy.
    ///
    /// `Ok(None)` means the load was superseded or torn down while waiting.
    async fn fetch_with_retry(&self, generation: u64, query: &EntryQuery) -> DomainResult<Option<Vec<Entry>>> {
        let mut schedule = self.policy.schedule();
        let mut attempt = 1;
        loop {
            if !self.is_current(generation) {
                return Ok(None);
            }
            match self.store.query_entries(query).await {
                Ok(entries) => return Ok(Some(entries)),
                Err(err) if err.is_retryable() && self.policy.allows_retry_after(attempt) => {
                    let delay = schedule.next_backoff().unwrap_or(self.policy.max_delay);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "feed fetch failed, retrying"
                    );
                    let still_current = self.state.send_if_modified(|s| {
                        if !self.is_current(generation) {
                            return false;
                        }
                        s.retry_count = attempt;
                        true
                    });
                    if !still_current {
                        return Ok(None);
                    }

                    let cancelled = self.cancelled.notified();
                    tokio::pin!(cancelled);
                    // Register before the last check so a newer load cannot slip in unseen.
                    cancelled.as_mut().enable();
                    if !self.is_current(generation) {
                        return Ok(None);
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancelled => return Ok(None),
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn fail(&self, generation: u64, err: &DomainError) {
        let applied = self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.loading = false;
            s.error = Some(err.clone());
            true
        });
        if applied {
            error!(error = %err, attempts = self.policy.max_attempts, "feed load failed");
            self.notifier.display(MSG_FEED_FAILED, Severity::Error);
        }
    }

    /// Sets a displayed counter to `value` unless it already shows more.
    fn patch_counter(&self, entry_id: &str, counter: Counter, value: u64) {
        self.state.send_if_modified(|s| {
            match s.entries.iter_mut().find(|e| e.id == entry_id) {
                Some(entry) if entry.counter(counter) < value => {
                    entry.set_counter(counter, value);
                    true
                }
                _ => false,
            }
        });
    }

    /// Adds a like through the store's atomic increment, then reloads the
    /// loaded pages. Returns the new like count.
    pub async fn record_like(&self, entry_id: &str) -> DomainResult<u64> {
        match self.store.increment_counter(entry_id, Counter::Likes).await {
            Ok(likes) => {
                info!(entry_id, likes, "entry liked");
                self.patch_counter(entry_id, Counter::Likes, likes);
                self.notifier.display(MSG_LIKED, Severity::Success);
                if let Err(err) = self.refresh().await {
                    warn!(error = %err, "feed refresh after like failed");
                }
                Ok(likes)
            }
            Err(err) => {
                warn!(entry_id, error = %err, "like failed");
                self.notifier.display(MSG_LIKE_FAILED, Severity::Error);
                Err(err)
            }
        }
    }

    /// Counts a view. Losing one is harmless, so failures are only logged.
    pub async fn record_view(&self, entry_id: &str) {
        match self.store.increment_counter(entry_id, Counter::Views).await {
            Ok(views) => self.patch_counter(entry_id, Counter::Views, views),
            Err(err) => debug!(entry_id, error = %err, "view not recorded"),
        }
    }

    /// Fetches the comments of one entry and attaches them to it.
    pub async fn load_comments(&self, entry_id: &str) -> DomainResult<Vec<Comment>> {
        let comments = self.store.list_comments(entry_id).await?;
        self.state.send_if_modified(|s| match s.entries.iter_mut().find(|e| e.id == entry_id) {
            Some(entry) => {
                entry.comments = comments.clone();
                true
            }
            None => false,
        });
        Ok(comments)
    }

    /// Appends a comment by the signed-in user and reloads that entry's comments.
    pub async fn submit_comment(&self, entry_id: &str, text: &str) -> DomainResult<Comment> {
        if text.trim().is_empty() {
            return Err(DomainError::Validation("comment cannot be empty".into()));
        }

        let identity = match self.session.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.notifier.display(MSG_SIGN_IN, Severity::Error);
                return Err(DomainError::AuthRequired("commenting needs a signed-in user".into()));
            }
            Err(err) => {
                self.notifier.display(MSG_COMMENT_FAILED, Severity::Error);
                return Err(err);
            }
        };

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            entry_id: entry_id.to_string(),
            user_id: identity.user_id,
            content: text.to_string(),
            created_at: Utc::now(),
        };
        let created = match self.store.insert_comment(comment).await {
            Ok(created) => created,
            Err(err) => {
                warn!(entry_id, error = %err, "comment insert failed");
                self.notifier.display(MSG_COMMENT_FAILED, Severity::Error);
                return Err(err);
            }
        };

        info!(entry_id, comment_id = %created.id, "comment added");
        self.notifier.display(MSG_COMMENT_ADDED, Severity::Success);
        if let Err(err) = self.load_comments(entry_id).await {
            warn!(entry_id, error = %err, "comment reload failed");
        }
        Ok(created)
    }

    /// Hands a loaded entry to `target` as title "Diary Entry" plus its text.
    ///
    /// A dismissed share is silent; any other failure is reported.
    pub fn share(&self, entry_id: &str, target: &dyn ShareTarget) -> DomainResult<SharePayload> {
        let payload = self
            .state
            .borrow()
            .entry(entry_id)
            .map(SharePayload::for_entry)
            .ok_or_else(|| DomainError::NotFound("Entry".into(), entry_id.to_string()))?;

        match target.share(&payload) {
            Ok(()) => {
                info!(entry_id, "entry shared");
                self.notifier.display(MSG_SHARED, Severity::Success);
                Ok(payload)
            }
            Err(err @ DomainError::Cancelled(_)) => {
                debug!(entry_id, "share dismissed");
                Err(err)
            }
            Err(err) => {
                warn!(entry_id, error = %err, "share failed");
                self.notifier.display(MSG_SHARE_FAILED, Severity::Error);
                Err(err)
            }
        }
    }

    /// Resets state and abandons anything in flight, including backoff sleeps.
    pub fn teardown(&self) {
        self.begin_generation();
        self.state.send_replace(FeedState::default());
        debug!("feed controller torn down");
    }
}

/// Keeps already-fetched comment lists across a reload of the same entries.
fn carry_comments(old: &[Entry], fresh: &mut [Entry]) {
    for entry in fresh.iter_mut().filter(|e| e.comments.is_empty()) {
        if let Some(prev) = old.iter().find(|o| o.id == entry.id) {
            entry.comments = prev.comments.clone();
        }
    }
}
