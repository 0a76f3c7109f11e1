//! # domains
//!
//! Data model, query vocabulary and port traits for the diary feed.
//! Nothing in this crate performs I/O.

pub mod error;
pub mod models;
pub mod ports;
pub mod projection;
pub mod query;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
pub use projection::*;
pub use query::*;
