//! `NotificationSink` that writes user messages through `tracing`.

use domains::{NotificationSink, Severity};
use tracing::{error, info};

/// Messages land on the `notify` target so a subscriber can route them
/// separately from diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn display(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => info!(target: "notify", kind = "success", "{message}"),
            Severity::Info => info!(target: "notify", kind = "info", "{message}"),
            Severity::Error => error!(target: "notify", kind = "error", "{message}"),
        }
    }
}
