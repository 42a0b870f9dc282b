use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Host configuration snapshot for one environment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Root directory of the indexed vault.
    #[serde(default = "default_vault_root")]
    pub vault_root: String,

    /// Folder (relative to `vault_root`) holding collection data and chats.
    #[serde(default = "default_smart_connections_folder")]
    pub smart_connections_folder: String,

    /// Comma-separated file exclusions.
    #[serde(default)]
    pub file_exclusions: String,

    /// Comma-separated folder exclusions.
    #[serde(default)]
    pub folder_exclusions: String,

    /// Comma-separated heading exclusions.
    #[serde(default)]
    pub excluded_headings: String,

    #[serde(default = "default_system_prompts_folder")]
    pub system_prompts_folder: String,

    /// Embedding model used by both collections. Empty disables embeddings.
    #[serde(default = "default_embed_model_key")]
    pub embed_model_key: String,

    #[serde(default = "default_chat_model_platform_key")]
    pub chat_model_platform_key: String,

    /// Per-platform chat model settings, keyed by platform key.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformSettings>,

    #[serde(default = "default_enable_mobile")]
    pub enable_mobile: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub companion: CompanionConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub notices: NoticesConfig,
}

fn default_vault_root() -> String {
    ".".to_string()
}

fn default_smart_connections_folder() -> String {
    ".smart-env".to_string()
}

fn default_system_prompts_folder() -> String {
    "smart prompts".to_string()
}

fn default_embed_model_key() -> String {
    "TaylorAI/bge-micro-v2".to_string()
}

fn default_chat_model_platform_key() -> String {
    "open_router".to_string()
}

fn default_enable_mobile() -> bool {
    true
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            smart_connections_folder: default_smart_connections_folder(),
            file_exclusions: String::new(),
            folder_exclusions: String::new(),
            excluded_headings: String::new(),
            system_prompts_folder: default_system_prompts_folder(),
            embed_model_key: default_embed_model_key(),
            chat_model_platform_key: default_chat_model_platform_key(),
            platforms: BTreeMap::new(),
            enable_mobile: default_enable_mobile(),
            logging: LoggingConfig::default(),
            companion: CompanionConfig::default(),
            gateway: GatewayConfig::default(),
            lifecycle: LifecycleConfig::default(),
            sync: SyncConfig::default(),
            notices: NoticesConfig::default(),
        }
    }
}

impl EnvConfig {
    pub fn embeddings_enabled(&self) -> bool {
        !self.embed_model_key.trim().is_empty()
    }

    pub fn platform(&self, key: &str) -> Option<&PlatformSettings> {
        self.platforms.get(key)
    }
}

/// Chat model settings for one platform. Unknown keys are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_key: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PlatformSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or `~/.vault-env/logs` if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "vault_env_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. `~` is expanded.
    #[serde(default)]
    pub directory: Option<String>,

    /// How the log file rolls over.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Colour console output. Unset means colour only when stderr is a terminal.
    #[serde(default)]
    pub ansi: Option<bool>,

    /// Print the `vault_env.<area>` target on every line.
    #[serde(default = "default_logging_targets")]
    pub targets: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One file per process.
    #[default]
    Never,
    Hourly,
    Daily,
}

fn default_logging_targets() -> bool {
    true
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
            rotation: LogRotation::default(),
            ansi: None,
            targets: default_logging_targets(),
        }
    }
}

/// Optional local companion service that can import on the environment's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    #[serde(default = "default_companion_enabled")]
    pub enabled: bool,

    #[serde(default = "default_companion_base_url")]
    pub base_url: String,

    #[serde(default = "default_companion_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upper bound for the import poll loop. Unset keeps polling until done.
    #[serde(default)]
    pub import_timeout_ms: Option<u64>,
}

fn default_companion_enabled() -> bool {
    true
}

fn default_companion_base_url() -> String {
    "http://localhost:37421".to_string()
}

fn default_companion_probe_timeout_ms() -> u64 {
    1_000
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            enabled: default_companion_enabled(),
            base_url: default_companion_base_url(),
            probe_timeout_ms: default_companion_probe_timeout_ms(),
            import_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_port() -> u16 {
    37042
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            port: default_gateway_port(),
        }
    }
}

/// Upper bounds for the lifecycle waits. Unset means wait until the condition holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub sync_gate_timeout_ms: Option<u64>,

    #[serde(default)]
    pub ui_container_timeout_ms: Option<u64>,
}

impl LifecycleConfig {
    pub fn sync_gate_timeout(&self) -> Option<Duration> {
        self.sync_gate_timeout_ms.map(Duration::from_millis)
    }

    pub fn ui_container_timeout(&self) -> Option<Duration> {
        self.ui_container_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// JSON file `{ "status": "...", "syncing": bool }` written by the sync integration.
    #[serde(default)]
    pub status_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoticesConfig {
    /// Notice ids that are never shown.
    #[serde(default)]
    pub muted: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: EnvConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.smart_connections_folder, ".smart-env");
        assert_eq!(cfg.chat_model_platform_key, "open_router");
        assert_eq!(cfg.companion.base_url, "http://localhost:37421");
        assert_eq!(cfg.gateway.port, 37042);
        assert!(cfg.lifecycle.sync_gate_timeout().is_none());
        assert!(cfg.embeddings_enabled());
    }

    #[test]
    fn test_logging_section() {
        let cfg: EnvConfig = toml::from_str(
            r#"
            [logging]
            file = true
            directory = "~/logs/vault"
            rotation = "daily"
            ansi = false
            "#,
        )
        .unwrap();
        assert!(cfg.logging.file);
        assert_eq!(cfg.logging.directory.as_deref(), Some("~/logs/vault"));
        assert_eq!(cfg.logging.rotation, LogRotation::Daily);
        assert_eq!(cfg.logging.ansi, Some(false));
        assert!(cfg.logging.targets);
        assert_eq!(cfg.logging.level, "info");

        let defaults = LoggingConfig::default();
        assert_eq!(defaults.rotation, LogRotation::Never);
        assert!(defaults.ansi.is_none());
    }

    #[test]
    fn test_platform_settings_keep_extra_keys() {
        let cfg: EnvConfig = toml::from_str(
            r#"
chat_model_platform_key = "openai"

[platforms.openai]
api_key = "sk-test"
model_key = "gpt-4o"
temperature = 0.2
"#,
        )
        .unwrap();
        let openai = cfg.platform("openai").unwrap();
        assert!(openai.has_api_key());
        assert_eq!(openai.model_key.as_deref(), Some("gpt-4o"));
        assert_eq!(openai.extra.get("temperature"), Some(&serde_json::json!(0.2)));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let settings = PlatformSettings {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!settings.has_api_key());
    }
}
