//! Plain-text rendering of feed and diary listings.

use std::fmt::Write;

use domains::{Category, Entry};
use services::FeedState;

const RULE: &str = "----------------------------------------";

/// One entry: header line with id, time and counters, then the content.
pub fn render_entry(entry: &Entry) -> String {
    let mut out = String::new();
    let visibility = if entry.is_public { "public" } else { "private" };
    let _ = writeln!(
        out,
        "#{}  {}  [{}]  likes {}  views {}",
        entry.id,
        entry.created_at.format("%Y-%m-%d %H:%M"),
        visibility,
        entry.likes,
        entry.views
    );
    if let Some(author) = &entry.user_id {
        let _ = writeln!(out, "by {author}");
    }
    let _ = writeln!(out, "{}", entry.content);
    for comment in &entry.comments {
        let _ = writeln!(out, "  > {}: {}", comment.user_id, comment.content);
    }
    out
}

/// Entries separated by rules, or a placeholder when there are none.
pub fn render_listing<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> String {
    let rendered: Vec<String> = entries.into_iter().map(render_entry).collect();
    if rendered.is_empty() {
        return "(no entries)\n".to_string();
    }
    rendered.join(&format!("{RULE}\n"))
}

/// The feed with its status line.
pub fn render_feed(state: &FeedState) -> String {
    let mut out = String::new();
    let filters = &state.filters;
    let _ = writeln!(
        out,
        "Public Feed  sort: {} {}  page: {}{}",
        filters.sort.key,
        filters.sort.direction.as_str(),
        state.page,
        if state.has_more { "  (more available)" } else { "" }
    );
    if !filters.search.is_empty() {
        let _ = writeln!(out, "search: {}", filters.search);
    }
    if let Some(category) = &filters.category {
        let _ = writeln!(out, "category: {category}");
    }
    if let Some(err) = &state.error {
        let _ = writeln!(out, "error: {err} (retry with `feed` again)");
    }
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&render_listing(&state.entries));
    out
}

pub fn render_categories(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| format!("{:<20} {:<12} {}\n", c.id, c.name, c.description))
        .collect()
}
