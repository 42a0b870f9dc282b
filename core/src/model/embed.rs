//! Embedding model registry shared by both collections.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// An embedding-capable model attached to a collection.
pub trait EmbedModel: Send + Sync {
    fn model_key(&self) -> &str;
    fn dims(&self) -> Option<usize>;
}

#[async_trait]
pub trait EmbedModelLoader: Send + Sync {
    async fn load(&self, model_key: &str) -> anyhow::Result<Arc<dyn EmbedModel>>;
}

/// Active models by key. Loads each key at most once until cleared.
#[derive(Default)]
pub struct EmbedModelRegistry {
    models: Mutex<HashMap<String, Arc<dyn EmbedModel>>>,
}

impl EmbedModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(
        &self,
        model_key: &str,
        loader: &dyn EmbedModelLoader,
    ) -> anyhow::Result<Arc<dyn EmbedModel>> {
        let mut models = self.models.lock().await;
        if let Some(model) = models.get(model_key) {
            return Ok(model.clone());
        }
        tracing::info!(
            target: "vault_env.embed",
            stage = "embed.load",
            model_key = %model_key
        );
        let model = loader.load(model_key).await?;
        models.insert(model_key.to_string(), model.clone());
        Ok(model)
    }

    pub async fn len(&self) -> usize {
        self.models.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.models.lock().await.clear();
    }
}
