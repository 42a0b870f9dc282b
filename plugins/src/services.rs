//! `HostServicesFactory` implementation: builds every collaborator from
//! configuration so the CLI only wires the environment.
use std::sync::Arc;

use async_trait::async_trait;
use vault_env_core::api::{
    ConfigSource, EnvConfig, EnvError, HostPlatform, HostServices, HostServicesFactory, TokioClock,
};

use crate::chat::HostUiSlot;
use crate::chunk::HeadingChunkerFactory;
use crate::collection::JsonCollectionFactory;
use crate::embed::CatalogEmbedLoader;
use crate::factory;

pub struct PluginServicesFactory {
    config_source: Arc<dyn ConfigSource>,
    ui: Arc<HostUiSlot>,
    platform: HostPlatform,
}

impl PluginServicesFactory {
    pub fn new(config_source: Arc<dyn ConfigSource>) -> Self {
        Self {
            config_source,
            ui: Arc::new(HostUiSlot::default()),
            platform: HostPlatform::default(),
        }
    }

    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// The slot the host fills once its view is ready.
    pub fn ui(&self) -> Arc<HostUiSlot> {
        self.ui.clone()
    }
}

#[async_trait]
impl HostServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &EnvConfig) -> Result<HostServices, EnvError> {
        let request = factory::build_request(cfg).map_err(EnvError::Plugin)?;
        Ok(HostServices {
            collections: Arc::new(JsonCollectionFactory),
            embed_loader: Arc::new(CatalogEmbedLoader),
            chunker: Arc::new(HeadingChunkerFactory),
            sync_status: factory::build_sync_status(cfg),
            notices: factory::build_notices(cfg),
            request,
            ui: self.ui.clone(),
            chat: factory::build_chat(cfg),
            gateway: factory::build_gateway(cfg),
            config_source: self.config_source.clone(),
            clock: Arc::new(TokioClock),
            platform: self.platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_env_core::api::{EnvPhase, Environment, InitReport, StaticConfigSource};

    #[tokio::test]
    async fn test_services_bring_up_an_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# Intro\nsome text to index\n").unwrap();
        let mut cfg = EnvConfig {
            vault_root: dir.path().display().to_string(),
            ..EnvConfig::default()
        };
        cfg.gateway.enabled = false;
        cfg.companion.enabled = false;

        let factory = PluginServicesFactory::new(Arc::new(StaticConfigSource(cfg.clone())));
        factory.ui().set("main");
        let services = factory.build_services(&cfg).await.unwrap();
        let env = Environment::new(cfg, services);

        let report = env.init().await.unwrap();
        assert!(matches!(report, InitReport::Ready { chat_sessions: 0, .. }));
        assert_eq!(env.phase().await, EnvPhase::Ready);

        let report = env.save().await;
        assert_eq!(report.failed.len(), 0);
        assert!(dir.path().join(".smart-env/smart_sources.json").exists());
        env.unload().await.unwrap();
    }
}
