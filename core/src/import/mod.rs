//! Import strategies: the collection's own local import, or delegation to a
//! companion service.

pub mod companion;

use std::fmt;

use async_trait::async_trait;

pub use companion::{CompanionBridge, CompanionReply, RemoteImport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Local import finished.
    Local { sources: usize, blocks: usize },
    /// The companion reported nothing new to import.
    AlreadyCurrent,
    /// The companion finished after `polls` trigger requests.
    Delegated { polls: u32 },
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { sources, blocks } => {
                write!(f, "local import: {sources} sources, {blocks} blocks")
            }
            Self::AlreadyCurrent => f.write_str("recently imported"),
            Self::Delegated { polls } => write!(f, "companion import after {polls} polls"),
        }
    }
}

#[async_trait]
pub trait ImportStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn import(&self, collection: &str) -> anyhow::Result<ImportOutcome>;
}

/// Re-runs collection initialization after new content arrives.
#[async_trait]
pub trait EntityReloader: Send + Sync {
    async fn reload_entities(&self) -> anyhow::Result<()>;
}
