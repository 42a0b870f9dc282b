//! Configuration source that re-reads the TOML file on every reload.

use std::path::PathBuf;

use vault_env_core::api::{ConfigSource, EnvConfig};
use vault_env_core::config::{load_default, load_from_path};

#[derive(Debug, Clone, Default)]
pub struct FileConfigSource {
    path: Option<PathBuf>,
    vault_root: Option<String>,
}

impl FileConfigSource {
    /// `path: None` uses the default lookup order.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            vault_root: None,
        }
    }

    /// Pin the vault root regardless of what the file says.
    pub fn with_vault_root(mut self, vault_root: Option<String>) -> Self {
        self.vault_root = vault_root;
        self
    }
}

impl ConfigSource for FileConfigSource {
    fn current(&self) -> anyhow::Result<EnvConfig> {
        let mut cfg = match &self.path {
            Some(path) => load_from_path(path)?,
            None => load_default()?,
        };
        if let Some(root) = &self.vault_root {
            cfg.vault_root = root.clone();
        }
        Ok(cfg)
    }
}
