//! # Moderation
//!
//! Administrator view over every entry, public or private. Works on a
//! fully loaded list and narrows it client-side with the shared projection.

use std::sync::Arc;

use domains::{
    project, DomainError, DomainResult, Entry, EntryPatch, EntryQuery, EntryStore, NotificationSink,
    SessionProvider, Severity, SortSpec,
};
use tracing::{info, warn};

pub struct AdminService {
    store: Arc<dyn EntryStore>,
    notifier: Arc<dyn NotificationSink>,
    session: Arc<dyn SessionProvider>,
    admin_email: Option<String>,
    entries: Vec<Entry>,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn NotificationSink>,
        session: Arc<dyn SessionProvider>,
        admin_email: Option<String>,
    ) -> Self {
        Self { store, notifier, session, admin_email, entries: Vec::new() }
    }

    /// Whether the signed-in user is the configured administrator.
    pub async fn is_admin(&self) -> DomainResult<bool> {
        let Some(admin) = self.admin_email.as_deref() else {
            return Ok(false);
        };
        let identity = self.session.current_identity().await?;
        Ok(identity
            .and_then(|i| i.email)
            .is_some_and(|email| email.eq_ignore_ascii_case(admin)))
    }

    async fn ensure_admin(&self) -> DomainResult<()> {
        if self.is_admin().await? {
            Ok(())
        } else {
            Err(DomainError::AuthRequired("administrator access required".into()))
        }
    }

    /// Entries as of the last successful load, newest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Fetches every entry, replacing the loaded list only on success.
    pub async fn load_all(&mut self) -> DomainResult<&[Entry]> {
        self.ensure_admin().await?;
        match self.store.query_entries(&EntryQuery::all()).await {
            Ok(entries) => {
                info!(count = entries.len(), "moderation list loaded");
                self.entries = entries;
                Ok(&self.entries)
            }
            Err(err) => {
                warn!(error = %err, "moderation list fetch failed");
                self.notifier.display("Failed to fetch entries", Severity::Error);
                Err(err)
            }
        }
    }

    /// Loaded entries narrowed by `search` and ordered by `sort`.
    pub fn browse(&self, search: &str, sort: SortSpec) -> Vec<&Entry> {
        project(&self.entries, search, sort)
    }

    pub async fn delete_entry(&mut self, id: &str) -> DomainResult<()> {
        self.ensure_admin().await?;
        if let Err(err) = self.store.delete_entry(id).await {
            warn!(entry_id = id, error = %err, "delete failed");
            self.notifier.display("Failed to delete entry", Severity::Error);
            return Err(err);
        }
        info!(entry_id = id, "entry deleted by moderator");
        self.notifier.display("Entry deleted", Severity::Success);
        self.load_all().await.map(|_| ())
    }

    /// Flips an entry between the public feed and private.
    pub async fn toggle_public(&mut self, id: &str) -> DomainResult<bool> {
        self.ensure_admin().await?;
        let currently_public = self
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.is_public)
            .ok_or_else(|| DomainError::NotFound("Entry".into(), id.to_string()))?;

        if let Err(err) = self.store.update_entry(id, EntryPatch::visibility(!currently_public)).await {
            warn!(entry_id = id, error = %err, "visibility update failed");
            self.notifier.display("Failed to update entry", Severity::Error);
            return Err(err);
        }

        let message = if currently_public {
            "Entry hidden from public feed"
        } else {
            "Entry added to public feed"
        };
        info!(entry_id = id, public = !currently_public, "entry visibility changed");
        self.notifier.display(message, Severity::Success);
        self.load_all().await?;
        Ok(!currently_public)
    }
}
