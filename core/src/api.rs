//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `vault_env_core::api` instead of reaching into internal modules.

pub use crate::chunk::{Block, Chunker, ChunkerFactory};
pub use crate::collection::{
    Collection, CollectionFactory, CollectionPair, EmbedSlot, ImportSlot, SaveReport, BLOCKS,
    SOURCES,
};
pub use crate::config::{
    load_default, load_from_path, CompanionConfig, ConfigSnapshot, ConfigSource, EnvConfig,
    Exclusions, GatewayConfig, LifecycleConfig, LogRotation, LoggingConfig, PlatformSettings,
    StaticConfigSource, SyncConfig,
};
pub use crate::context::{HostPlatform, HostServices, HostServicesFactory};
pub use crate::conversation::{
    ActionsRegistry, ChatFactory, ChatStore, ChatSubsystem, UiContainer, UiContainerProvider,
};
pub use crate::env::{
    EntitiesOutcome, Environment, InitReport, LifecyclePolicies, WeakEnvironment,
    MOBILE_DISABLED_NOTICE,
};
pub use crate::error::{CliError, EnvError};
pub use crate::gateway::{EnvStatus, SocketGateway, StatusSource};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestAdapter};
pub use crate::import::{EntityReloader, ImportOutcome, ImportStrategy};
pub use crate::model::{ChatModel, EmbedModel, EmbedModelLoader, EmbedModelRegistry};
pub use crate::notice::{NoticeOptions, NoticeService};
pub use crate::state::{EntityPhase, EnvPhase, StateEvent};
pub use crate::sync_gate::SyncStatusProvider;
pub use crate::wait::{Clock, TokioClock, WaitError, WaitPolicy};
