pub mod exclusions;
pub mod load;
pub mod types;

pub use exclusions::{ConfigSnapshot, Exclusions};
pub use load::{get_vault_env_data_dir, load_default, load_from_path, resolve_config_path};
pub use types::{
    CompanionConfig, EnvConfig, GatewayConfig, LifecycleConfig, LogRotation, LoggingConfig,
    NoticesConfig, PlatformSettings, SyncConfig,
};

/// Supplies the current host configuration when the environment reloads.
pub trait ConfigSource: Send + Sync {
    fn current(&self) -> anyhow::Result<EnvConfig>;
}

/// A fixed configuration, for hosts whose settings never change at runtime.
pub struct StaticConfigSource(pub EnvConfig);

impl ConfigSource for StaticConfigSource {
    fn current(&self) -> anyhow::Result<EnvConfig> {
        Ok(self.0.clone())
    }
}
