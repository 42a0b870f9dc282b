//! Chat and actions subsystem, built once the host UI container exists.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::ChatModel;
use crate::wait::{wait_until, CancelToken, Clock, WaitError, WaitPolicy};

/// Opaque handle to the host's chat view container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiContainer {
    pub id: String,
}

/// Polled, never pushed: the host UI initializes on its own schedule.
pub trait UiContainerProvider: Send + Sync {
    fn container(&self) -> Option<UiContainer>;
}

pub trait ActionsRegistry: Send + Sync {
    fn init(&self) -> anyhow::Result<()>;
    fn action_names(&self) -> Vec<String>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Load every saved chat session. Returns how many were loaded.
    async fn load_all(&self) -> anyhow::Result<usize>;
}

pub trait ChatFactory: Send + Sync {
    fn actions(&self) -> Arc<dyn ActionsRegistry>;
    fn open(
        &self,
        container: &UiContainer,
        model: Option<Arc<ChatModel>>,
    ) -> anyhow::Result<Arc<dyn ChatStore>>;
}

pub struct ChatSubsystem {
    pub actions: Arc<dyn ActionsRegistry>,
    pub container: UiContainer,
    pub chats: Arc<dyn ChatStore>,
    pub sessions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("actions init failed: {0}")]
    Actions(anyhow::Error),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("chat open failed: {0}")]
    Open(anyhow::Error),
}

pub struct ConversationInit<'a> {
    pub factory: &'a dyn ChatFactory,
    pub ui: &'a dyn UiContainerProvider,
    pub clock: &'a dyn Clock,
    pub policy: WaitPolicy,
}

impl ConversationInit<'_> {
    /// Init actions, wait for the container, then open chats and load sessions.
    pub async fn run(
        &self,
        model: Option<Arc<ChatModel>>,
        cancel: &mut CancelToken,
    ) -> Result<ChatSubsystem, ConversationError> {
        let actions = self.factory.actions();
        actions.init().map_err(ConversationError::Actions)?;

        let ui = self.ui;
        wait_until(self.clock, self.policy, cancel, "ui container", || {
            ui.container().is_some()
        })
        .await?;
        let container = self.ui.container().ok_or(WaitError::Cancelled {
            what: "ui container",
        })?;

        let chats = self
            .factory
            .open(&container, model)
            .map_err(ConversationError::Open)?;
        let sessions = chats.load_all().await.map_err(ConversationError::Open)?;
        tracing::info!(
            target: "vault_env.chat",
            stage = "chat.ready",
            container = %container.id,
            sessions = sessions,
            actions = actions.action_names().len()
        );

        Ok(ChatSubsystem {
            actions,
            container,
            chats,
            sessions,
        })
    }
}
