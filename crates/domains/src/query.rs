//! # Query Vocabulary
//!
//! Filter, ordering and paging parameters understood by every `EntryStore`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::models::Entry;
use crate::projection::matches_search;

/// Field the feed can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Likes,
    Views,
}

impl SortKey {
    /// Column name in the remote table.
    pub fn column(self) -> &'static str {
        match self {
            SortKey::Date => "created_at",
            SortKey::Likes => "likes",
            SortKey::Views => "views",
        }
    }

    /// Compares two entries on this field alone, ascending.
    pub fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            SortKey::Date => a.created_at.cmp(&b.created_at),
            SortKey::Likes => a.likes.cmp(&b.likes),
            SortKey::Views => a.views.cmp(&b.views),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Date => "date",
            SortKey::Likes => "likes",
            SortKey::Views => "views",
        };
        f.write_str(name)
    }
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "created_at" => Ok(SortKey::Date),
            "likes" => Ok(SortKey::Likes),
            "views" => Ok(SortKey::Views),
            other => Err(DomainError::Validation(format!("unknown sort key '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Active ordering. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Result of the user picking `key` in the sort control.
    ///
    /// The same key flips the direction; a different key starts descending.
    pub fn toggled(self, key: SortKey) -> Self {
        if self.key == key {
            Self { key, direction: self.direction.flipped() }
        } else {
            Self { key, direction: SortDirection::Desc }
        }
    }
}

/// Filter settings the feed is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilters {
    /// Empty matches everything
    pub search: String,
    /// `None` matches every category
    pub category: Option<String>,
    pub sort: SortSpec,
}

/// Offset/limit slice of an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: usize,
    pub limit: usize,
}

impl PageRange {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Range covering the first `pages` pages of `page_size` entries.
    pub fn leading(pages: u32, page_size: usize) -> Self {
        Self { offset: 0, limit: pages.max(1) as usize * page_size }
    }
}

/// Everything a store needs to answer an entry listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// `Some(true)` restricts to public entries
    pub visibility: Option<bool>,
    pub owner: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring over content and author; `None` or blank matches all
    pub search: Option<String>,
    pub sort: SortSpec,
    /// `None` returns the whole ordered result
    pub range: Option<PageRange>,
}

impl EntryQuery {
    /// Every entry, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    /// Public entries matching the feed filters, sliced to `range`.
    pub fn public_feed(filters: &FeedFilters, range: PageRange) -> Self {
        Self {
            visibility: Some(true),
            owner: None,
            category: filters.category.clone().filter(|c| !c.is_empty()),
            search: Some(filters.search.clone()).filter(|s| !s.trim().is_empty()),
            sort: filters.sort,
            range: Some(range),
        }
    }

    /// Entries written by one user, newest first.
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self { owner: Some(user_id.into()), ..Self::default() }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = Some(search).filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_range(mut self, range: PageRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Whether `entry` passes every filter of this query.
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(visible) = self.visibility {
            if entry.is_public != visible {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if entry.user_id.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if entry.category_id.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        match &self.search {
            Some(needle) => matches_search(entry, &needle.trim().to_lowercase()),
            None => true,
        }
    }

    /// Total order every store applies: the chosen field, then newest
    /// first, then id ascending.
    pub fn store_order(&self, a: &Entry, b: &Entry) -> Ordering {
        self.sort
            .direction
            .apply(self.sort.key.compare(a, b))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Applies filters, ordering and range to an in-memory slice.
    pub fn evaluate<'a, I>(&self, entries: I) -> Vec<Entry>
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut hits: Vec<&Entry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        hits.sort_by(|a, b| self.store_order(a, b));
        let (offset, limit) = match self.range {
            Some(range) => (range.offset, range.limit),
            None => (0, usize::MAX),
        };
        hits.into_iter().skip(offset).take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, day: u32, likes: u64) -> Entry {
        let mut e = Entry::new(id, format!("content {id}"), Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        e.likes = likes;
        e.is_public = true;
        e
    }

    #[test]
    fn test_toggle_same_key_twice_restores_direction() {
        let start = SortSpec::default();
        let once = start.toggled(SortKey::Date);
        assert_eq!(once.direction, SortDirection::Asc);
        assert_eq!(once.toggled(SortKey::Date), start);
    }

    #[test]
    fn test_new_key_always_starts_descending() {
        let asc = SortSpec::new(SortKey::Date, SortDirection::Asc);
        assert_eq!(asc.toggled(SortKey::Likes), SortSpec::new(SortKey::Likes, SortDirection::Desc));

        let desc = SortSpec::new(SortKey::Views, SortDirection::Desc);
        assert_eq!(desc.toggled(SortKey::Likes), SortSpec::new(SortKey::Likes, SortDirection::Desc));
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("Likes".parse::<SortKey>().unwrap(), SortKey::Likes);
        assert_eq!("created_at".parse::<SortKey>().unwrap(), SortKey::Date);
        assert!(matches!("stars".parse::<SortKey>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_public_feed_query_drops_blank_filters() {
        let filters = FeedFilters { search: "  ".into(), category: Some(String::new()), sort: SortSpec::default() };
        let query = EntryQuery::public_feed(&filters, PageRange::new(0, 10));
        assert_eq!(query.search, None);
        assert_eq!(query.category, None);
        assert_eq!(query.visibility, Some(true));
    }

    #[test]
    fn test_evaluate_orders_ties_newest_first_then_by_id() {
        let entries = vec![entry("b", 1, 5), entry("a", 1, 5), entry("c", 2, 5)];
        let query = EntryQuery::all().with_sort(SortSpec::new(SortKey::Likes, SortDirection::Desc));
        let ids: Vec<_> = query.evaluate(&entries).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_evaluate_slices_range_after_ordering() {
        let entries: Vec<_> = (1..=5).map(|d| entry(&format!("e{d}"), d, 0)).collect();
        let query = EntryQuery::all().with_range(PageRange::new(2, 2));
        let ids: Vec<_> = query.evaluate(&entries).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e3", "e2"]);
    }

    #[test]
    fn test_leading_range_covers_loaded_pages() {
        assert_eq!(PageRange::leading(3, 10), PageRange::new(0, 30));
        assert_eq!(PageRange::leading(0, 10), PageRange::new(0, 10));
    }
}
