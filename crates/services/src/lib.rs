//! # services
//!
//! Application logic for the diary: the public feed controller, the
//! moderation surface and the private diary. Everything talks to storage,
//! notifications and the session through the `domains` ports.

pub mod admin;
pub mod diary;
pub mod feed;
pub mod retry;

pub use admin::AdminService;
pub use diary::{backup_file_name, render_backup, DiaryService};
pub use feed::{FeedController, FeedState};
pub use retry::{Backoff, LinearBackoff, RetryPolicy, RetrySchedule};
