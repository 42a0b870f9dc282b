//! Embed model catalog. Resolves model keys to descriptors; the embedding
//! computation itself lives elsewhere.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use vault_env_core::api::{EmbedModel, EmbedModelLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedBackend {
    /// Runs on the host, no network.
    Local,
    /// Calls a hosted API and needs a key.
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: &'static str,
    pub dims: usize,
    pub max_tokens: usize,
    pub backend: EmbedBackend,
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "TaylorAI/bge-micro-v2",
        dims: 384,
        max_tokens: 512,
        backend: EmbedBackend::Local,
    },
    CatalogEntry {
        key: "TaylorAI/gte-tiny",
        dims: 384,
        max_tokens: 512,
        backend: EmbedBackend::Local,
    },
    CatalogEntry {
        key: "Xenova/jina-embeddings-v2-small-en",
        dims: 512,
        max_tokens: 8_192,
        backend: EmbedBackend::Local,
    },
    CatalogEntry {
        key: "text-embedding-3-small",
        dims: 1_536,
        max_tokens: 8_191,
        backend: EmbedBackend::Api,
    },
    CatalogEntry {
        key: "text-embedding-3-large",
        dims: 3_072,
        max_tokens: 8_191,
        backend: EmbedBackend::Api,
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown embed model: {0}")]
    UnknownModel(String),
}

pub fn lookup(model_key: &str) -> Result<&'static CatalogEntry, CatalogError> {
    CATALOG
        .iter()
        .find(|entry| entry.key == model_key)
        .ok_or_else(|| CatalogError::UnknownModel(model_key.to_string()))
}

#[derive(Debug)]
pub struct CatalogModel {
    entry: &'static CatalogEntry,
}

impl CatalogModel {
    pub fn backend(&self) -> EmbedBackend {
        self.entry.backend
    }

    pub fn max_tokens(&self) -> usize {
        self.entry.max_tokens
    }
}

impl EmbedModel for CatalogModel {
    fn model_key(&self) -> &str {
        self.entry.key
    }

    fn dims(&self) -> Option<usize> {
        Some(self.entry.dims)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogEmbedLoader;

#[async_trait]
impl EmbedModelLoader for CatalogEmbedLoader {
    async fn load(&self, model_key: &str) -> anyhow::Result<Arc<dyn EmbedModel>> {
        let entry = lookup(model_key)?;
        tracing::info!(
            target: "vault_env.embed",
            stage = "embed.load",
            model_key = %entry.key,
            dims = entry.dims,
            backend = ?entry.backend
        );
        Ok(Arc::new(CatalogModel { entry }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_model_resolves() {
        let model = CatalogEmbedLoader.load("TaylorAI/bge-micro-v2").await.unwrap();
        assert_eq!(model.model_key(), "TaylorAI/bge-micro-v2");
        assert_eq!(model.dims(), Some(384));
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected() {
        let err = CatalogEmbedLoader.load("no/such-model").await.err().unwrap();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::UnknownModel("no/such-model".to_string()))
        );
    }

    #[test]
    fn test_api_models_are_marked() {
        assert_eq!(lookup("text-embedding-3-small").unwrap().backend, EmbedBackend::Api);
    }
}
