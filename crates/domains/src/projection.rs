//! # View Projection
//!
//! Turns an already-loaded entry list into the sequence a view renders.
//! Used by the moderation surface, which works on the full list client-side.
//!
//! When the input is in store order for the default sort (newest first),
//! the output equals what the store returns for the same search and sort.

use crate::models::Entry;
use crate::query::SortSpec;

/// Case-insensitive substring match over content and author.
///
/// `needle_lower` must already be lowercased.
pub fn matches_search(entry: &Entry, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    entry.content.to_lowercase().contains(needle_lower)
        || entry
            .user_id
            .as_deref()
            .is_some_and(|author| author.to_lowercase().contains(needle_lower))
}

/// Filters `entries` by `search` and orders them by `sort`.
///
/// The sort is stable: ties keep their load order.
pub fn project<'a>(entries: &'a [Entry], search: &str, sort: SortSpec) -> Vec<&'a Entry> {
    let needle = search.trim().to_lowercase();
    let mut visible: Vec<&Entry> = entries.iter().filter(|e| matches_search(e, &needle)).collect();
    visible.sort_by(|a, b| sort.direction.apply(sort.key.compare(a, b)));
    visible
}
