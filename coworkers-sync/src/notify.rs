//! Completion notification.

/// Text shown when a pass completes.
pub const SYNC_COMPLETED: &str = "Sync completed.";

pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("{message}");
    }
}
