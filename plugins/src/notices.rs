//! Notices rendered through the log.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use vault_env_core::api::{NoticeOptions, NoticeService};

/// Logs each notice at `info` and tracks which ids are on screen.
///
/// Ids listed as muted are never shown.
#[derive(Debug, Default)]
pub struct LogNotices {
    active: Mutex<HashSet<String>>,
    muted: Vec<String>,
}

impl LogNotices {
    pub fn new(muted: Vec<String>) -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
            muted,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

impl NoticeService for LogNotices {
    fn show(&self, id: &str, lines: Vec<String>, options: NoticeOptions) {
        if self.muted.iter().any(|m| m == id) {
            tracing::debug!(target: "vault_env.notice", stage = "notice.muted", id = %id);
            return;
        }
        let replaced = !self.lock().insert(id.to_string());
        tracing::info!(
            target: "vault_env.notice",
            stage = "notice.show",
            id = %id,
            replaced = replaced,
            timeout_ms = options.timeout.as_millis() as u64,
            "{}",
            lines.join(" | ")
        );
    }

    fn remove(&self, id: &str) {
        if self.lock().remove(id) {
            tracing::debug!(target: "vault_env.notice", stage = "notice.remove", id = %id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_and_remove() {
        let notices = LogNotices::default();
        notices.show("importing", vec!["working".to_string()], NoticeOptions::default());
        notices.show("importing", vec!["still working".to_string()], NoticeOptions::default());
        assert!(notices.is_active("importing"));
        assert_eq!(notices.active_count(), 1);

        notices.remove("importing");
        notices.remove("importing");
        assert!(!notices.is_active("importing"));
    }

    #[test]
    fn test_muted_ids_are_not_shown() {
        let notices = LogNotices::new(vec!["mobile disabled".to_string()]);
        notices.show("mobile disabled", vec![], NoticeOptions::default());
        assert_eq!(notices.active_count(), 0);
    }
}
