//! Chat model resolution for the active platform.

use std::fmt;
use std::sync::Arc;

use crate::config::{EnvConfig, PlatformSettings};
use crate::http::RequestAdapter;

pub const OPEN_ROUTER: &str = "open_router";

/// Fallback key baked in at build time for the open_router platform.
pub fn default_open_router_key() -> Option<&'static str> {
    option_env!("DEFAULT_OPEN_ROUTER_API_KEY").filter(|k| !k.trim().is_empty())
}

/// Pick the settings for `platform_key`.
///
/// open_router without a configured key gets only the build-time default key;
/// every other case uses the platform's settings verbatim, or empty settings.
pub fn resolve_platform_settings(
    cfg: &EnvConfig,
    platform_key: &str,
    fallback_key: Option<&str>,
) -> PlatformSettings {
    let configured = cfg.platform(platform_key);
    let has_key = configured.map(PlatformSettings::has_api_key).unwrap_or(false);
    if platform_key == OPEN_ROUTER && !has_key {
        return PlatformSettings {
            api_key: fallback_key.map(str::to_string),
            ..PlatformSettings::default()
        };
    }
    configured.cloned().unwrap_or_default()
}

/// One chat model instance per (re)initialization.
pub struct ChatModel {
    platform_key: String,
    settings: PlatformSettings,
    request: Arc<dyn RequestAdapter>,
}

impl ChatModel {
    pub fn new(
        platform_key: impl Into<String>,
        settings: PlatformSettings,
        request: Arc<dyn RequestAdapter>,
    ) -> Self {
        Self {
            platform_key: platform_key.into(),
            settings,
            request,
        }
    }

    /// Build from configuration; `platform_key` overrides the configured one.
    pub fn from_config(
        cfg: &EnvConfig,
        platform_key: Option<&str>,
        request: Arc<dyn RequestAdapter>,
    ) -> Self {
        let platform_key = platform_key.unwrap_or(&cfg.chat_model_platform_key);
        let settings = resolve_platform_settings(cfg, platform_key, default_open_router_key());
        Self::new(platform_key, settings, request)
    }

    pub fn platform_key(&self) -> &str {
        &self.platform_key
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn request_adapter(&self) -> &Arc<dyn RequestAdapter> {
        &self.request
    }
}

impl fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModel")
            .field("platform_key", &self.platform_key)
            .field("model_key", &self.settings.model_key)
            .field("has_api_key", &self.settings.has_api_key())
            .finish()
    }
}
