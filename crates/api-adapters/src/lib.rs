//! # api-adapters
//!
//! Presentation side: where notifications and shared entries go, and how
//! listings look on a terminal.

pub mod console;
pub mod notifier;
pub mod share;

pub use console::{render_categories, render_entry, render_feed, render_listing};
pub use notifier::TracingNotifier;
pub use share::ConsoleShare;
