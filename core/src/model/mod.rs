pub mod chat;
pub mod embed;

pub use chat::{resolve_platform_settings, ChatModel};
pub use embed::{EmbedModel, EmbedModelLoader, EmbedModelRegistry};
