//! Collection contracts and the source/block pair.

pub mod pair;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::chunk::Chunker;
use crate::config::ConfigSnapshot;
use crate::import::{ImportOutcome, ImportStrategy};
use crate::model::EmbedModel;

pub use pair::{CollectionPair, SaveReport};

pub const SOURCES: &str = "smart_sources";
pub const BLOCKS: &str = "smart_blocks";

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Apply baseline settings before the first load.
    fn merge_defaults(&self);

    async fn load(&self) -> anyhow::Result<()>;
    async fn save(&self) -> anyhow::Result<()>;
    async fn unload(&self);

    fn attach_embed_model(&self, model: Arc<dyn EmbedModel>);
    fn embed_model(&self) -> Option<Arc<dyn EmbedModel>>;

    fn import_strategy(&self) -> Arc<dyn ImportStrategy>;
    fn set_import_strategy(&self, strategy: Arc<dyn ImportStrategy>);

    async fn import(&self) -> anyhow::Result<ImportOutcome> {
        let strategy = self.import_strategy();
        strategy.import(self.name()).await
    }
}

/// Builds a fresh collection pair for one initialization.
pub trait CollectionFactory: Send + Sync {
    fn build(
        &self,
        snapshot: &ConfigSnapshot,
        chunker: Option<Arc<dyn Chunker>>,
    ) -> anyhow::Result<CollectionPair>;
}

/// Swappable import strategy holder for collection implementations.
pub struct ImportSlot {
    strategy: RwLock<Arc<dyn ImportStrategy>>,
}

impl ImportSlot {
    pub fn new(default: Arc<dyn ImportStrategy>) -> Self {
        Self {
            strategy: RwLock::new(default),
        }
    }

    pub fn get(&self) -> Arc<dyn ImportStrategy> {
        self.strategy
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set(&self, strategy: Arc<dyn ImportStrategy>) {
        *self.strategy.write().unwrap_or_else(|e| e.into_inner()) = strategy;
    }
}

/// Attached embed model holder for collection implementations.
#[derive(Default)]
pub struct EmbedSlot {
    model: RwLock<Option<Arc<dyn EmbedModel>>>,
}

impl EmbedSlot {
    pub fn get(&self) -> Option<Arc<dyn EmbedModel>> {
        self.model.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, model: Arc<dyn EmbedModel>) {
        *self.model.write().unwrap_or_else(|e| e.into_inner()) = Some(model);
    }

    pub fn clear(&self) {
        *self.model.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
