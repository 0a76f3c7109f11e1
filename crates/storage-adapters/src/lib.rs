//! # storage-adapters
//!
//! `EntryStore` implementations:
//! - [`MemoryEntryStore`]: process-local tables, the reference for store query semantics
//! - [`LocalEntryStore`]: the signed-out fallback, one JSON file rewritten on every change
//! - [`PostgrestEntryStore`]: hosted table store over HTTP (feature `remote-http`)

pub mod local;
pub mod memory;
#[cfg(feature = "remote-http")]
pub mod postgrest;
pub mod selection;

pub use local::LocalEntryStore;
pub use memory::MemoryEntryStore;
#[cfg(feature = "remote-http")]
pub use postgrest::PostgrestEntryStore;
pub use domains::StoreKind;
pub use selection::select_diary_store;
