//! Sync status read from a JSON file that the sync integration keeps current.

use std::path::PathBuf;

use serde::Deserialize;
use vault_env_core::api::SyncStatusProvider;

#[derive(Debug, Default, Deserialize)]
struct StatusFile {
    #[serde(default)]
    status: String,
    #[serde(default)]
    syncing: bool,
}

/// Re-reads the file on every call. A missing or unreadable file means
/// "not syncing".
#[derive(Debug, Clone)]
pub struct FileSyncStatus {
    path: PathBuf,
}

impl FileSyncStatus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> StatusFile {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return StatusFile::default(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::debug!(
                target: "vault_env.sync",
                stage = "sync.read",
                path = %self.path.display(),
                error = %err,
                "ignoring malformed sync status"
            );
            StatusFile::default()
        })
    }
}

impl SyncStatusProvider for FileSyncStatus {
    fn status_text(&self) -> String {
        self.read().status
    }

    fn is_syncing(&self) -> bool {
        self.read().syncing
    }
}
