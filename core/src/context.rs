//! Collaborators the host hands to the environment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chunk::ChunkerFactory;
use crate::collection::CollectionFactory;
use crate::config::{ConfigSource, EnvConfig};
use crate::conversation::{ChatFactory, UiContainerProvider};
use crate::error::EnvError;
use crate::gateway::SocketGateway;
use crate::http::RequestAdapter;
use crate::model::EmbedModelLoader;
use crate::notice::NoticeService;
use crate::sync_gate::SyncStatusProvider;
use crate::wait::Clock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostPlatform {
    pub is_mobile: bool,
}

#[derive(Clone)]
pub struct HostServices {
    pub collections: Arc<dyn CollectionFactory>,
    pub embed_loader: Arc<dyn EmbedModelLoader>,
    pub chunker: Arc<dyn ChunkerFactory>,
    /// Absent on hosts without a sync integration.
    pub sync_status: Option<Arc<dyn SyncStatusProvider>>,
    pub notices: Arc<dyn NoticeService>,
    pub request: Arc<dyn RequestAdapter>,
    pub ui: Arc<dyn UiContainerProvider>,
    pub chat: Arc<dyn ChatFactory>,
    pub gateway: Option<Arc<dyn SocketGateway>>,
    pub config_source: Arc<dyn ConfigSource>,
    pub clock: Arc<dyn Clock>,
    pub platform: HostPlatform,
}

#[async_trait]
pub trait HostServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &EnvConfig) -> Result<HostServices, EnvError>;
}
