//! # Domain Models
//!
//! These structs mirror the records kept in the remote table store.
//! Field names match the store's column names so they serialize as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single diary post, private or public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque identifier assigned by the writer (uuid v4 in practice)
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Owning user; entries kept in the local slot have none
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    /// Single optional category, stored in the `category_id` column
    #[serde(default)]
    pub category_id: Option<String>,
    /// Populated on demand; never sent back to the store
    #[serde(default, skip_serializing)]
    pub comments: Vec<Comment>,
}

impl Entry {
    pub fn new(id: impl Into<String>, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at,
            user_id: None,
            is_public: false,
            views: 0,
            likes: 0,
            category_id: None,
            comments: Vec::new(),
        }
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Likes => self.likes,
            Counter::Views => self.views,
        }
    }

    pub fn set_counter(&mut self, counter: Counter, value: u64) {
        match counter {
            Counter::Likes => self.likes = value,
            Counter::Views => self.views = value,
        }
    }
}

/// Partial update applied by the owner or a moderator.
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `Some(None)` clears the category (sent as `null`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl EntryPatch {
    pub fn visibility(is_public: bool) -> Self {
        Self { is_public: Some(is_public), ..Self::default() }
    }

    /// Owner edit: only the given fields change; an empty category clears it.
    pub fn edit(content: Option<String>, category: Option<String>, is_public: Option<bool>) -> Self {
        Self {
            content,
            category_id: category.map(|c| Some(c).filter(|c| !c.trim().is_empty())),
            is_public,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.category_id.is_none() && self.is_public.is_none()
    }

    pub fn apply(&self, entry: &mut Entry) {
        if let Some(content) = &self.content {
            entry.content = content.clone();
        }
        if let Some(category_id) = &self.category_id {
            entry.category_id = category_id.clone();
        }
        if let Some(is_public) = self.is_public {
            entry.is_public = is_public;
        }
    }
}

/// What a writer supplies when creating an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub content: String,
    pub category_id: Option<String>,
    pub is_public: bool,
}

/// Which store backs the private diary for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Remote,
    Local,
}

/// What gets handed to a share target for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
}

impl SharePayload {
    pub fn for_entry(entry: &Entry) -> Self {
        Self { title: "Diary Entry".to_string(), text: entry.content.clone() }
    }
}

/// Monotonic per-entry counters. Only ever incremented by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Likes,
    Views,
}

impl Counter {
    pub fn column(self) -> &'static str {
        match self {
            Counter::Likes => "likes",
            Counter::Views => "views",
        }
    }
}

/// A label entries can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    fn builtin(id: &str, name: &str, description: &str) -> Self {
        Self { id: id.to_string(), name: name.to_string(), description: description.to_string() }
    }
}

/// Categories offered when the store has none, so filing still works
/// against an empty backend.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::builtin("default-personal", "Personal", "Everyday thoughts and feelings"),
        Category::builtin("default-work", "Work", "Projects, meetings and career notes"),
        Category::builtin("default-travel", "Travel", "Trips, places and adventures"),
        Category::builtin("default-ideas", "Ideas", "Sparks worth keeping"),
        Category::builtin("default-gratitude", "Gratitude", "Things to be thankful for"),
    ]
}

/// Append-only reply attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub entry_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user as reported by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), email: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
