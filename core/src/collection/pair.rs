use std::sync::Arc;

use super::Collection;
use crate::error::EnvError;
use crate::import::ImportStrategy;
use crate::model::{EmbedModel, EmbedModelLoader, EmbedModelRegistry};

/// Outcome of `CollectionPair::save`. Failures are reported per collection,
/// never combined into one error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: Vec<String>,
    pub failed: Vec<String>,
}

/// The source collection and the block collection it subsumes.
///
/// The blocks' embed model must be bound before `load`, since loading
/// sources cascades into block data.
#[derive(Clone)]
pub struct CollectionPair {
    sources: Arc<dyn Collection>,
    blocks: Arc<dyn Collection>,
}

impl CollectionPair {
    pub fn new(sources: Arc<dyn Collection>, blocks: Arc<dyn Collection>) -> Self {
        Self { sources, blocks }
    }

    pub fn sources(&self) -> &Arc<dyn Collection> {
        &self.sources
    }

    pub fn blocks(&self) -> &Arc<dyn Collection> {
        &self.blocks
    }

    pub fn merge_defaults(&self) {
        self.sources.merge_defaults();
        self.blocks.merge_defaults();
    }

    /// Resolve `model_key` through the registry and attach it, blocks first.
    /// An empty key leaves both collections without a model.
    pub async fn bind_embed_model(
        &self,
        registry: &EmbedModelRegistry,
        loader: &dyn EmbedModelLoader,
        model_key: &str,
    ) -> Result<Option<Arc<dyn EmbedModel>>, EnvError> {
        let model_key = model_key.trim();
        if model_key.is_empty() {
            return Ok(None);
        }
        let model = registry
            .get_or_load(model_key, loader)
            .await
            .map_err(|source| EnvError::EmbedModel {
                model_key: model_key.to_string(),
                source,
            })?;
        self.blocks.attach_embed_model(model.clone());
        self.sources.attach_embed_model(model.clone());
        Ok(Some(model))
    }

    /// Load sources, which also loads blocks.
    pub async fn load(&self) -> Result<(), EnvError> {
        self.sources
            .load()
            .await
            .map_err(|e| EnvError::collection(self.sources.name(), e))
    }

    pub fn has_embed_model(&self) -> bool {
        self.sources.embed_model().is_some() || self.blocks.embed_model().is_some()
    }

    pub fn set_import_strategy(&self, strategy: Arc<dyn ImportStrategy>) {
        self.sources.set_import_strategy(strategy.clone());
        self.blocks.set_import_strategy(strategy);
    }

    pub async fn save(&self) -> SaveReport {
        let mut report = SaveReport::default();
        for collection in [&self.sources, &self.blocks] {
            match collection.save().await {
                Ok(()) => report.saved.push(collection.name().to_string()),
                Err(err) => {
                    tracing::warn!(
                        target: "vault_env.collection",
                        stage = "collection.save",
                        collection = %collection.name(),
                        error = %err,
                        "save failed"
                    );
                    report.failed.push(collection.name().to_string());
                }
            }
        }
        report
    }

    pub async fn unload(&self) {
        self.sources.unload().await;
        self.blocks.unload().await;
    }
}
