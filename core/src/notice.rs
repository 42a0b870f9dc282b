//! Transient user-facing notices, at most one per id.

use std::time::Duration;

pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeOptions {
    pub timeout: Duration,
}

impl Default for NoticeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_NOTICE_TIMEOUT,
        }
    }
}

pub trait NoticeService: Send + Sync {
    /// Show or replace the notice with this id.
    fn show(&self, id: &str, lines: Vec<String>, options: NoticeOptions);
    /// Remove the notice; removing an absent id is a no-op.
    fn remove(&self, id: &str);
}
