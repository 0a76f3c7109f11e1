//! # Core Traits (Ports)
//!
//! Adapters implement these traits; services only ever see the traits.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::models::{Category, Comment, Counter, Entry, EntryPatch, Identity, SharePayload};
use crate::query::EntryQuery;

/// Persistence contract for entries, comments and categories.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait EntryStore: Send + Sync {
    // Entry Operations
    async fn query_entries(&self, query: &EntryQuery) -> DomainResult<Vec<Entry>>;
    async fn insert_entry(&self, entry: Entry) -> DomainResult<Entry>;
    async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()>;
    async fn delete_entry(&self, id: &str) -> DomainResult<()>;

    /// Adds one to `counter` as a single store-side operation and returns
    /// the authoritative new value.
    async fn increment_counter(&self, id: &str, counter: Counter) -> DomainResult<u64>;

    // Comment Operations
    async fn list_comments(&self, entry_id: &str) -> DomainResult<Vec<Comment>>;
    async fn insert_comment(&self, comment: Comment) -> DomainResult<Comment>;

    // Category Operations
    async fn list_categories(&self) -> DomainResult<Vec<Category>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// Surface for transient user-facing messages. Fire-and-forget.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn display(&self, message: &str, severity: Severity);
}

/// Somewhere an entry can be sent (system share sheet, clipboard, stdout).
///
/// Returns `Cancelled` when the user dismisses the share.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait ShareTarget: Send + Sync {
    fn share(&self, payload: &SharePayload) -> DomainResult<()>;
}

/// Reports who is signed in, if anyone.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_identity(&self) -> DomainResult<Option<Identity>>;
}
