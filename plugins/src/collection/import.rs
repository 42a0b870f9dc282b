//! Local import: scan the vault's markdown files into sources and blocks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use vault_env_core::api::{Chunker, Exclusions, ImportOutcome, ImportStrategy};

use super::{Item, JsonCollection};
use crate::vault;

struct Targets {
    sources: Weak<JsonCollection>,
    blocks: Weak<JsonCollection>,
}

pub struct VaultImport {
    root: PathBuf,
    exclusions: Exclusions,
    chunker: Option<Arc<dyn Chunker>>,
    targets: OnceLock<Targets>,
}

impl VaultImport {
    pub fn new(root: PathBuf, exclusions: Exclusions, chunker: Option<Arc<dyn Chunker>>) -> Self {
        Self {
            root,
            exclusions,
            chunker,
            targets: OnceLock::new(),
        }
    }

    /// Point the import at the collections it fills. Later calls are ignored.
    pub fn bind(&self, sources: &Arc<JsonCollection>, blocks: &Arc<JsonCollection>) {
        let _ = self.targets.set(Targets {
            sources: Arc::downgrade(sources),
            blocks: Arc::downgrade(blocks),
        });
    }

    fn targets(&self) -> anyhow::Result<(Arc<JsonCollection>, Arc<JsonCollection>)> {
        let targets = self
            .targets
            .get()
            .ok_or_else(|| anyhow::anyhow!("vault import is not bound to collections"))?;
        match (targets.sources.upgrade(), targets.blocks.upgrade()) {
            (Some(sources), Some(blocks)) => Ok((sources, blocks)),
            _ => anyhow::bail!("collections were dropped"),
        }
    }
}

/// Markdown files under `root`, vault-relative, minus every exclusion. Sorted.
pub fn scan_markdown(
    root: &Path,
    exclusions: &Exclusions,
) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let patterns = exclusions
        .fs_patterns
        .iter()
        .map(|p| glob::Pattern::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let pattern = format!("{}/**/*.md", glob::Pattern::escape(&root.to_string_lossy()));

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(
                    target: "vault_env.import",
                    stage = "import.scan",
                    error = %err,
                    "unreadable path skipped"
                );
                continue;
            }
        };
        let Some(rel) = vault::relative_path(root, &path) else {
            continue;
        };
        if exclusions.excludes_path(&rel) || patterns.iter().any(|p| p.matches(&rel)) {
            continue;
        }
        files.push((rel, path));
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl ImportStrategy for VaultImport {
    fn name(&self) -> &str {
        "local"
    }

    async fn import(&self, collection: &str) -> anyhow::Result<ImportOutcome> {
        let (sources, blocks) = self.targets()?;
        tracing::info!(
            target: "vault_env.import",
            stage = "import.local.in",
            collection = %collection,
            root = %self.root.display()
        );

        let root = self.root.clone();
        let exclusions = self.exclusions.clone();
        let files = tokio::task::spawn_blocking(move || scan_markdown(&root, &exclusions)).await??;
        let min_chars = blocks.settings().min_chars.unwrap_or(0);

        let mut source_items = Vec::with_capacity(files.len());
        let mut block_items = Vec::new();
        for (rel, path) in files {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(
                        target: "vault_env.import",
                        stage = "import.read",
                        path = %rel,
                        error = %err
                    );
                    continue;
                }
            };

            if let Some(chunker) = &self.chunker {
                for block in chunker.chunk(&content) {
                    if block.text.trim().chars().count() < min_chars {
                        continue;
                    }
                    block_items.push(Item {
                        key: format!("{rel}{}", block.key),
                        source: Some(rel.clone()),
                        size: block.text.len() as u64,
                        line_start: block.line_start,
                        line_end: block.line_end,
                    });
                }
            }
            source_items.push(Item {
                size: content.len() as u64,
                line_start: 1,
                line_end: content.lines().count(),
                key: rel,
                source: None,
            });
        }

        let outcome = ImportOutcome::Local {
            sources: source_items.len(),
            blocks: block_items.len(),
        };
        sources.replace_items(source_items);
        blocks.replace_items(block_items);
        tracing::info!(
            target: "vault_env.import",
            stage = "import.local.out",
            outcome = %outcome
        );
        Ok(outcome)
    }
}
