//! Chat collaborators: the action registry, the host UI slot and the
//! JSON chat thread store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vault_env_core::api::{
    ActionsRegistry, ChatFactory, ChatModel, ChatStore, UiContainer, UiContainerProvider,
};

pub const DEFAULT_ACTIONS: &[&str] = &["lookup", "find_connections", "open_chat"];

#[derive(Debug, Default)]
pub struct DefaultActions {
    registered: Mutex<Vec<String>>,
}

impl ActionsRegistry for DefaultActions {
    fn init(&self) -> anyhow::Result<()> {
        let mut registered = self.registered.lock().unwrap_or_else(|e| e.into_inner());
        registered.clear();
        registered.extend(DEFAULT_ACTIONS.iter().map(|a| a.to_string()));
        Ok(())
    }

    fn action_names(&self) -> Vec<String> {
        self.registered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Container slot the host fills once its view exists.
#[derive(Debug, Default)]
pub struct HostUiSlot {
    container: RwLock<Option<UiContainer>>,
}

impl HostUiSlot {
    pub fn set(&self, id: impl Into<String>) {
        *self.container.write().unwrap_or_else(|e| e.into_inner()) =
            Some(UiContainer { id: id.into() });
    }

    pub fn clear(&self) {
        *self.container.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl UiContainerProvider for HostUiSlot {
    fn container(&self) -> Option<UiContainer> {
        self.container
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Chat threads stored one per file as `<dir>/<id>.json`.
pub struct JsonChatStore {
    dir: PathBuf,
    platform_key: Option<String>,
    threads: Mutex<BTreeMap<String, ChatThread>>,
}

impl JsonChatStore {
    pub fn new(dir: PathBuf, platform_key: Option<String>) -> Self {
        Self {
            dir,
            platform_key,
            threads: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn thread_ids(&self) -> Vec<String> {
        self.threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatStore for JsonChatStore {
    async fn load_all(&self) -> anyhow::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut loaded = BTreeMap::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ChatThread>(&raw) {
                Ok(thread) => {
                    loaded.insert(thread.id.clone(), thread);
                }
                Err(err) => tracing::warn!(
                    target: "vault_env.chat",
                    stage = "chat.load",
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable chat"
                ),
            }
        }

        let count = loaded.len();
        *self.threads.lock().unwrap_or_else(|e| e.into_inner()) = loaded;
        tracing::debug!(
            target: "vault_env.chat",
            stage = "chat.load",
            threads = count,
            platform = ?self.platform_key
        );
        Ok(count)
    }
}

pub struct JsonChatFactory {
    chats_dir: PathBuf,
}

impl JsonChatFactory {
    pub fn new(chats_dir: PathBuf) -> Self {
        Self { chats_dir }
    }
}

impl ChatFactory for JsonChatFactory {
    fn actions(&self) -> Arc<dyn ActionsRegistry> {
        Arc::new(DefaultActions::default())
    }

    fn open(
        &self,
        container: &UiContainer,
        model: Option<Arc<ChatModel>>,
    ) -> anyhow::Result<Arc<dyn ChatStore>> {
        tracing::debug!(
            target: "vault_env.chat",
            stage = "chat.open",
            container = %container.id
        );
        Ok(Arc::new(JsonChatStore::new(
            self.chats_dir.clone(),
            model.map(|m| m.platform_key().to_string()),
        )))
    }
}
