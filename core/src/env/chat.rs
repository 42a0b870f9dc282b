use std::sync::Arc;

use super::Environment;
use crate::conversation::{ConversationError, ConversationInit};
use crate::error::EnvError;
use crate::model::ChatModel;
use crate::state::StateEvent;

impl Environment {
    /// Build a fresh chat model. `platform_key` overrides the configured platform.
    pub async fn init_chat_model(&self, platform_key: Option<&str>) -> Arc<ChatModel> {
        let snapshot = self.snapshot().await;
        let model = Arc::new(ChatModel::from_config(
            snapshot.config(),
            platform_key,
            self.inner.host.request.clone(),
        ));
        tracing::info!(
            target: "vault_env.chat",
            stage = "chat.model",
            platform = %model.platform_key()
        );
        *self.inner.chat_model.write().await = Some(model.clone());
        model
    }

    /// Init actions, wait for the host UI container, then load chats.
    pub async fn init_chat(&self) -> Result<usize, EnvError> {
        let snapshot = self.snapshot().await;
        let host = &self.inner.host;
        let model = self.chat_model().await;
        let mut cancel = self.inner.cancel.token();

        let init = ConversationInit {
            factory: host.chat.as_ref(),
            ui: host.ui.as_ref(),
            clock: host.clock.as_ref(),
            policy: self.inner.policies.ui_container_for(snapshot.config()),
        };
        let chat = init.run(model, &mut cancel).await.map_err(|e| match e {
            ConversationError::Wait(wait) => EnvError::Wait(wait),
            other => EnvError::Chat(other.to_string()),
        })?;

        let sessions = chat.sessions;
        *self.inner.chat.write().await = Some(chat);
        self.emit(StateEvent::ChatReady {
            sessions,
            timestamp: Self::now(),
        });
        Ok(sessions)
    }
}
