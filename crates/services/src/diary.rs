//! # Private Diary
//!
//! The writer's own entries. The store behind it is picked once at session
//! start (remote when signed in, the local slot otherwise); nothing in here
//! branches on authentication.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use domains::{
    default_categories, Category, DomainError, DomainResult, Entry, EntryDraft, EntryPatch, EntryQuery,
    EntryStore, Identity, NotificationSink, Severity, StoreKind,
};
use tracing::{info, warn};
use uuid::Uuid;

pub struct DiaryService {
    store: Arc<dyn EntryStore>,
    notifier: Arc<dyn NotificationSink>,
    owner: Option<Identity>,
    kind: StoreKind,
}

impl DiaryService {
    /// `kind` says which store `store` is; it only changes the wording of
    /// notifications.
    pub fn new(
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn NotificationSink>,
        owner: Option<Identity>,
        kind: StoreKind,
    ) -> Self {
        Self { store, notifier, owner, kind }
    }

    pub fn store_kind(&self) -> StoreKind {
        self.kind
    }

    fn own_entries(&self) -> EntryQuery {
        match &self.owner {
            Some(identity) => EntryQuery::owned_by(identity.user_id.clone()),
            None => EntryQuery::all(),
        }
    }

    /// The writer's entries, newest first.
    pub async fn list_entries(&self) -> DomainResult<Vec<Entry>> {
        self.store.query_entries(&self.own_entries()).await.inspect_err(|err| {
            warn!(error = %err, "diary fetch failed");
            self.notifier.display("Failed to fetch entries", Severity::Error);
        })
    }

    pub async fn create_entry(&self, draft: EntryDraft) -> DomainResult<Entry> {
        if draft.content.trim().is_empty() {
            return Err(DomainError::Validation("entry cannot be empty".into()));
        }

        let entry = Entry {
            user_id: self.owner.as_ref().map(|o| o.user_id.clone()),
            is_public: draft.is_public,
            category_id: draft.category_id,
            ..Entry::new(Uuid::new_v4().to_string(), draft.content, Utc::now())
        };

        match self.store.insert_entry(entry).await {
            Ok(saved) => {
                info!(entry_id = %saved.id, public = saved.is_public, store = ?self.kind, "entry saved");
                let message = match self.kind {
                    StoreKind::Remote => "Entry saved!",
                    StoreKind::Local => "Entry saved locally!",
                };
                self.notifier.display(message, Severity::Success);
                Ok(saved)
            }
            Err(err) => {
                warn!(error = %err, store = ?self.kind, "entry save failed");
                let message = match self.kind {
                    StoreKind::Remote => "Failed to save entry online",
                    StoreKind::Local => "Failed to save entry",
                };
                self.notifier.display(message, Severity::Error);
                Err(err)
            }
        }
    }

    /// Edits content, category or visibility of one entry.
    pub async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()> {
        if patch.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(DomainError::Validation("entry cannot be empty".into()));
        }
        if patch.is_empty() {
            return Err(DomainError::Validation("nothing to change".into()));
        }

        match self.store.update_entry(id, patch).await {
            Ok(()) => {
                info!(entry_id = id, store = ?self.kind, "entry updated");
                let message = match self.kind {
                    StoreKind::Remote => "Entry updated!",
                    StoreKind::Local => "Entry updated locally!",
                };
                self.notifier.display(message, Severity::Success);
                Ok(())
            }
            Err(err) => {
                warn!(entry_id = id, error = %err, "entry update failed");
                self.notifier.display("Failed to update entry", Severity::Error);
                Err(err)
            }
        }
    }

    /// Categories sorted by name, or the built-in set when the store has none.
    pub async fn categories(&self) -> Vec<Category> {
        match self.store.list_categories().await {
            Ok(mut categories) if !categories.is_empty() => {
                categories.sort_by(|a, b| a.name.cmp(&b.name));
                categories
            }
            Ok(_) => default_categories(),
            Err(err) => {
                warn!(error = %err, "category fetch failed, using defaults");
                self.notifier.display("Failed to fetch categories", Severity::Error);
                default_categories()
            }
        }
    }

    /// Plain-text export of every entry: `(file name, contents)`.
    pub async fn backup(&self) -> DomainResult<(String, String)> {
        let entries = self.list_entries().await?;
        let file_name = backup_file_name(Utc::now().date_naive());
        info!(count = entries.len(), file = %file_name, "backup created");
        self.notifier.display("Backup created!", Severity::Success);
        Ok((file_name, render_backup(&entries)))
    }
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("diary-backup-{}.txt", date.format("%Y-%m-%d"))
}

pub fn render_backup(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| format!("[{}]\n{}\n\n", e.created_at.format("%Y-%m-%d %H:%M:%S"), e.content))
        .collect::<Vec<_>>()
        .join("---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domains::{MockEntryStore, MockNotificationSink};

    fn quiet() -> Arc<MockNotificationSink> {
        let mut notifier = MockNotificationSink::new();
        notifier.expect_display().return_const(());
        Arc::new(notifier)
    }

    #[test]
    fn test_backup_format() {
        let a = Entry::new("a", "first", Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap());
        let b = Entry::new("b", "second", Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 5).unwrap());

        assert_eq!(
            render_backup(&[a, b]),
            "[2024-01-02 08:30:00]\nfirst\n\n---\n\n[2024-01-01 21:00:05]\nsecond\n\n"
        );
        assert_eq!(render_backup(&[]), "");
    }

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_file_name(date), "diary-backup-2024-03-09.txt");
    }

    #[tokio::test]
    async fn test_blank_entry_never_reaches_store() {
        let mut store = MockEntryStore::new();
        store.expect_insert_entry().never();
        let diary = DiaryService::new(Arc::new(store), quiet(), None, StoreKind::Local);

        let draft = EntryDraft { content: " \t".into(), ..EntryDraft::default() };
        assert!(matches!(diary.create_entry(draft).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_new_entry_is_stamped_with_owner() {
        let mut store = MockEntryStore::new();
        store
            .expect_insert_entry()
            .withf(|e| e.user_id.as_deref() == Some("u1") && e.is_public && e.likes == 0)
            .times(1)
            .returning(Ok);
        let diary = DiaryService::new(Arc::new(store), quiet(), Some(Identity::new("u1")), StoreKind::Remote);

        let draft = EntryDraft { content: "today".into(), is_public: true, ..EntryDraft::default() };
        let saved = diary.create_entry(draft).await.unwrap();
        assert!(!saved.id.is_empty());
    }

    fn expect_message(text: &'static str, severity: Severity) -> Arc<MockNotificationSink> {
        let mut notifier = MockNotificationSink::new();
        notifier
            .expect_display()
            .withf(move |msg, sev| msg == text && *sev == severity)
            .times(1)
            .return_const(());
        Arc::new(notifier)
    }

    #[tokio::test]
    async fn test_save_messages_name_the_store() {
        let draft = || EntryDraft { content: "today".into(), ..EntryDraft::default() };

        let mut store = MockEntryStore::new();
        store.expect_insert_entry().returning(Ok);
        let local = DiaryService::new(
            Arc::new(store),
            expect_message("Entry saved locally!", Severity::Success),
            None,
            StoreKind::Local,
        );
        local.create_entry(draft()).await.unwrap();

        let mut store = MockEntryStore::new();
        store
            .expect_insert_entry()
            .returning(|_| Err(DomainError::Transient("offline".into())));
        let remote = DiaryService::new(
            Arc::new(store),
            expect_message("Failed to save entry online", Severity::Error),
            Some(Identity::new("u1")),
            StoreKind::Remote,
        );
        assert!(remote.create_entry(draft()).await.is_err());
    }

    #[tokio::test]
    async fn test_local_edit_says_updated_locally() {
        let mut store = MockEntryStore::new();
        store
            .expect_update_entry()
            .withf(|id, patch| id == "e1" && patch.category_id == Some(None) && patch.is_public == Some(true))
            .times(1)
            .returning(|_, _| Ok(()));
        let diary = DiaryService::new(
            Arc::new(store),
            expect_message("Entry updated locally!", Severity::Success),
            None,
            StoreKind::Local,
        );

        diary.update_entry("e1", EntryPatch::edit(None, Some(String::new()), Some(true))).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_or_empty_edit_never_reaches_store() {
        let mut store = MockEntryStore::new();
        store.expect_update_entry().never();
        let diary = DiaryService::new(Arc::new(store), quiet(), None, StoreKind::Local);

        let blank = EntryPatch::edit(Some("  ".into()), None, None);
        assert!(matches!(diary.update_entry("e1", blank).await, Err(DomainError::Validation(_))));
        let nothing = EntryPatch::edit(None, None, None);
        assert!(matches!(diary.update_entry("e1", nothing).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_category_table_falls_back_to_defaults() {
        let mut store = MockEntryStore::new();
        store.expect_list_categories().returning(|| Ok(Vec::new()));
        let diary = DiaryService::new(Arc::new(store), quiet(), None, StoreKind::Local);

        assert_eq!(diary.categories().await, default_categories());
    }

    #[tokio::test]
    async fn test_category_failure_falls_back_to_defaults() {
        let mut store = MockEntryStore::new();
        store
            .expect_list_categories()
            .returning(|| Err(DomainError::Transient("offline".into())));
        let diary = DiaryService::new(Arc::new(store), quiet(), None, StoreKind::Local);

        assert_eq!(diary.categories().await.len(), default_categories().len());
    }

    #[tokio::test]
    async fn test_categories_are_sorted_by_name() {
        let mut store = MockEntryStore::new();
        store.expect_list_categories().returning(|| {
            Ok(vec![
                Category { id: "2".into(), name: "Zen".into(), description: String::new() },
                Category { id: "1".into(), name: "Art".into(), description: String::new() },
            ])
        });
        let diary = DiaryService::new(Arc::new(store), quiet(), None, StoreKind::Local);

        let names: Vec<_> = diary.categories().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Art", "Zen"]);
    }
}
