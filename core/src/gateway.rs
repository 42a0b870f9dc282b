//! Loopback socket bridge started alongside the environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::state::{EntityPhase, EnvPhase};

/// Point-in-time view of the environment, served over the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct EnvStatus {
    pub phase: EnvPhase,
    pub entities: EntityPhase,
    pub entities_loaded: bool,
    pub busy: bool,
    pub generation: u64,
    pub embed_models: usize,
    pub chat_sessions: Option<usize>,
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// `None` once the environment is gone.
    async fn status(&self) -> Option<EnvStatus>;
}

#[async_trait]
pub trait SocketGateway: Send + Sync {
    /// Bind and serve in the background. Failure must not block the caller.
    async fn start(&self, status: Arc<dyn StatusSource>) -> anyhow::Result<()>;
    async fn unload(&self);
}
