//! Picks the diary's backing store once, when the session starts.

use std::sync::Arc;

use domains::{EntryStore, Identity, StoreKind};
use tracing::info;

/// Signed-in users with a configured backend write remotely; everyone
/// else writes to the local slot.
pub fn select_diary_store(
    remote: Option<Arc<dyn EntryStore>>,
    local: Arc<dyn EntryStore>,
    identity: Option<&Identity>,
) -> (StoreKind, Arc<dyn EntryStore>) {
    let selected = match (remote, identity) {
        (Some(remote), Some(_)) => (StoreKind::Remote, remote),
        _ => (StoreKind::Local, local),
    };
    info!(store = ?selected.0, "diary store selected");
    selected
}
