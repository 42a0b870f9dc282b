//! JSON-file backed collections.

pub mod import;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vault_env_core::api::{
    Chunker, Collection, CollectionFactory, CollectionPair, ConfigSnapshot, EmbedModel, EmbedSlot,
    ImportSlot, ImportStrategy, BLOCKS, SOURCES,
};

use crate::vault;

pub use import::VaultImport;

/// Blocks shorter than this (in characters) are skipped unless configured otherwise.
pub const DEFAULT_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    /// Owning source path, set on blocks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub line_start: usize,
    #[serde(default)]
    pub line_end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chars: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    settings: CollectionSettings,
    #[serde(default)]
    items: BTreeMap<String, Item>,
}

/// A collection persisted as one JSON document.
///
/// The sources collection carries the blocks collection as its cascade, so
/// loading sources loads blocks too.
pub struct JsonCollection {
    name: String,
    path: PathBuf,
    doc: RwLock<Document>,
    embed: EmbedSlot,
    import: ImportSlot,
    cascade: Option<Arc<JsonCollection>>,
}

impl JsonCollection {
    pub fn new(
        name: impl Into<String>,
        path: PathBuf,
        cascade: Option<Arc<JsonCollection>>,
        import: Arc<dyn ImportStrategy>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            doc: RwLock::new(Document::default()),
            embed: EmbedSlot::default(),
            import: ImportSlot::new(import),
            cascade,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.doc.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.doc.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn items(&self) -> Vec<Item> {
        self.read().items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    pub fn settings(&self) -> CollectionSettings {
        self.read().settings.clone()
    }

    pub fn replace_items(&self, items: Vec<Item>) {
        let mut doc = self.write();
        doc.items = items.into_iter().map(|i| (i.key.clone(), i)).collect();
    }
}

#[async_trait]
impl Collection for JsonCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn merge_defaults(&self) {
        self.write()
            .settings
            .min_chars
            .get_or_insert(DEFAULT_MIN_CHARS);
    }

    async fn load(&self) -> anyhow::Result<()> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let mut loaded: Document = serde_json::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("parse {} failed: {e}", self.path.display())
                })?;
                let mut doc = self.write();
                loaded.settings.min_chars = loaded.settings.min_chars.or(doc.settings.min_chars);
                *doc = loaded;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.write().items.clear();
            }
            Err(err) => {
                return Err(anyhow::anyhow!(
                    "read {} failed: {err}",
                    self.path.display()
                ))
            }
        }
        tracing::debug!(
            target: "vault_env.collection",
            stage = "collection.load",
            collection = %self.name,
            items = self.len()
        );

        if let Some(cascade) = &self.cascade {
            cascade.load().await?;
        }
        Ok(())
    }

    async fn save(&self) -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(&*self.read())?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        tracing::debug!(
            target: "vault_env.collection",
            stage = "collection.save",
            collection = %self.name,
            path = %self.path.display()
        );
        Ok(())
    }

    async fn unload(&self) {
        self.write().items.clear();
        self.embed.clear();
    }

    fn attach_embed_model(&self, model: Arc<dyn EmbedModel>) {
        self.embed.set(model);
    }

    fn embed_model(&self) -> Option<Arc<dyn EmbedModel>> {
        self.embed.get()
    }

    fn import_strategy(&self) -> Arc<dyn ImportStrategy> {
        self.import.get()
    }

    fn set_import_strategy(&self, strategy: Arc<dyn ImportStrategy>) {
        self.import.set(strategy);
    }
}

/// Both collections with their concrete type, for callers that need items.
#[derive(Clone)]
pub struct JsonPair {
    pub sources: Arc<JsonCollection>,
    pub blocks: Arc<JsonCollection>,
}

impl JsonPair {
    pub fn build(snapshot: &ConfigSnapshot, chunker: Option<Arc<dyn Chunker>>) -> Self {
        let cfg = snapshot.config();
        let data_dir = vault::data_dir(cfg);
        let import = Arc::new(VaultImport::new(
            vault::vault_root(cfg),
            snapshot.exclusions().clone(),
            chunker,
        ));

        let blocks = Arc::new(JsonCollection::new(
            BLOCKS,
            data_dir.join(format!("{BLOCKS}.json")),
            None,
            import.clone(),
        ));
        let sources = Arc::new(JsonCollection::new(
            SOURCES,
            data_dir.join(format!("{SOURCES}.json")),
            Some(blocks.clone()),
            import.clone(),
        ));
        import.bind(&sources, &blocks);
        Self { sources, blocks }
    }

    pub fn into_pair(self) -> CollectionPair {
        CollectionPair::new(self.sources, self.blocks)
    }
}

pub struct JsonCollectionFactory;

impl CollectionFactory for JsonCollectionFactory {
    fn build(
        &self,
        snapshot: &ConfigSnapshot,
        chunker: Option<Arc<dyn Chunker>>,
    ) -> anyhow::Result<CollectionPair> {
        Ok(JsonPair::build(snapshot, chunker).into_pair())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_env_core::api::{EnvConfig, ImportOutcome};

    fn snapshot(root: &Path) -> ConfigSnapshot {
        ConfigSnapshot::new(EnvConfig {
            vault_root: root.display().to_string(),
            ..EnvConfig::default()
        })
    }

    #[tokio::test]
    async fn test_load_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pair = JsonPair::build(&snapshot(dir.path()), None);
        pair.sources.load().await.unwrap();
        assert!(pair.sources.is_empty());
        assert!(pair.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_cascades_to_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(dir.path());

        let first = JsonPair::build(&snap, None);
        first.sources.merge_defaults();
        first.sources.replace_items(vec![Item {
            key: "a.md".to_string(),
            ..Item::default()
        }]);
        first.blocks.replace_items(vec![Item {
            key: "a.md#Intro".to_string(),
            source: Some("a.md".to_string()),
            ..Item::default()
        }]);
        first.sources.save().await.unwrap();
        first.blocks.save().await.unwrap();
        assert!(dir.path().join(".smart-env/smart_sources.json").exists());

        let second = JsonPair::build(&snap, None);
        second.sources.load().await.unwrap();
        assert_eq!(second.sources.len(), 1);
        assert_eq!(second.blocks.items()[0].source.as_deref(), Some("a.md"));
        assert_eq!(second.sources.settings().min_chars, Some(DEFAULT_MIN_CHARS));
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join(".smart-env");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("smart_sources.json"), "{not json").unwrap();

        let pair = JsonPair::build(&snapshot(dir.path()), None);
        let err = pair.sources.load().await.unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[tokio::test]
    async fn test_unload_clears_items_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let pair = JsonPair::build(&snapshot(dir.path()), None);
        pair.sources.replace_items(vec![Item::default()]);
        pair.sources.unload().await;
        assert!(pair.sources.is_empty());
        assert!(pair.sources.embed_model().is_none());
    }

    #[tokio::test]
    async fn test_default_strategy_is_local() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# Intro\nhello world, long enough\n").unwrap();
        let pair = JsonPair::build(&snapshot(dir.path()), None);

        assert_eq!(pair.sources.import_strategy().name(), "local");
        let outcome = pair.sources.import().await.unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::Local {
                sources: 1,
                blocks: 0
            }
        );
    }
}
