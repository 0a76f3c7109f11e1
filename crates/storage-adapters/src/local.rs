//! # LocalEntryStore
//!
//! Signed-out fallback: the whole entry list lives in one JSON file that is
//! read wholesale and rewritten wholesale on every mutation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{
    Category, Comment, Counter, DomainError, DomainResult, Entry, EntryPatch, EntryQuery, EntryStore,
};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct LocalEntryStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl LocalEntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> DomainResult<Vec<Entry>> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                DomainError::Transient(format!("corrupt local diary {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(DomainError::transient(e)),
        }
    }

    async fn write_all(&self, entries: &[Entry]) -> DomainResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(DomainError::transient)?;
        }
        let bytes = serde_json::to_vec_pretty(entries).map_err(DomainError::transient)?;

        // Write beside the target, then swap, so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await.map_err(DomainError::transient)?;
        fs::rename(&tmp, &self.path).await.map_err(DomainError::transient)?;
        debug!(path = %self.path.display(), count = entries.len(), "local diary written");
        Ok(())
    }

    /// Loads the list, lets `change` edit it, and writes it back.
    async fn modify<T>(&self, change: impl FnOnce(&mut Vec<Entry>) -> DomainResult<T>) -> DomainResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        let out = change(&mut entries)?;
        self.write_all(&entries).await?;
        Ok(out)
    }

    fn find<'a>(entries: &'a mut [Entry], id: &str) -> DomainResult<&'a mut Entry> {
        entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DomainError::NotFound("Entry".into(), id.to_string()))
    }
}

#[async_trait]
impl EntryStore for LocalEntryStore {
    async fn query_entries(&self, query: &EntryQuery) -> DomainResult<Vec<Entry>> {
        let entries = self.read_all().await?;
        Ok(query.evaluate(&entries))
    }

    async fn insert_entry(&self, entry: Entry) -> DomainResult<Entry> {
        let saved = self
            .modify(|entries| {
                if entries.iter().any(|e| e.id == entry.id) {
                    return Err(DomainError::Validation(format!("entry {} already exists", entry.id)));
                }
                entries.insert(0, entry.clone());
                Ok(entry)
            })
            .await?;
        info!(entry_id = %saved.id, "entry saved locally");
        Ok(saved)
    }

    async fn update_entry(&self, id: &str, patch: EntryPatch) -> DomainResult<()> {
        self.modify(|entries| {
            patch.apply(Self::find(entries, id)?);
            Ok(())
        })
        .await
    }

    async fn delete_entry(&self, id: &str) -> DomainResult<()> {
        self.modify(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            if entries.len() == before {
                return Err(DomainError::NotFound("Entry".into(), id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn increment_counter(&self, id: &str, counter: Counter) -> DomainResult<u64> {
        self.modify(|entries| {
            let entry = Self::find(entries, id)?;
            let value = entry.counter(counter).saturating_add(1);
            entry.set_counter(counter, value);
            Ok(value)
        })
        .await
    }

    async fn list_comments(&self, _entry_id: &str) -> DomainResult<Vec<Comment>> {
        Ok(Vec::new())
    }

    async fn insert_comment(&self, _comment: Comment) -> DomainResult<Comment> {
        Err(DomainError::AuthRequired("comments need an account".into()))
    }

    async fn list_categories(&self) -> DomainResult<Vec<Category>> {
        Ok(Vec::new())
    }
}
