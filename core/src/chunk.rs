//! Content chunking collaborator, built once per `init()`.

use crate::config::ConfigSnapshot;

/// One heading-delimited section of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Heading path, e.g. `#Intro#Setup`.
    pub key: String,
    pub text: String,
    pub line_start: usize,
    pub line_end: usize,
}

pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str) -> Vec<Block>;
}

pub trait ChunkerFactory: Send + Sync {
    fn build(&self, snapshot: &ConfigSnapshot) -> anyhow::Result<std::sync::Arc<dyn Chunker>>;
}
