use std::path::{Path, PathBuf};

use super::types::EnvConfig;

/// Get the default data directory: ~/.vault-env
pub fn get_vault_env_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".vault-env"))
}

/// Resolve which config file would be read, if any.
///
/// Priority: `$VAULT_ENV_CONFIG`, `~/.vault-env/config.toml`, `./vault-env.toml`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(v) = std::env::var("VAULT_ENV_CONFIG") {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }

    if let Ok(dir) = get_vault_env_data_dir() {
        let home_config = dir.join("config.toml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    let local_config = Path::new("vault-env.toml");
    if local_config.exists() {
        return Some(local_config.to_path_buf());
    }

    None
}

pub fn load_from_path(path: &Path) -> anyhow::Result<EnvConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {} failed: {e}", path.display()))?;
    let mut cfg = toml::from_str::<EnvConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {} failed: {e}", path.display()))?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<EnvConfig> {
    match resolve_config_path() {
        Some(path) => load_from_path(&path),
        None => {
            let mut cfg = EnvConfig::default();
            apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

fn apply_env_overrides(cfg: &mut EnvConfig) {
    if let Ok(v) = std::env::var("VAULT_ENV_VAULT_ROOT") {
        if !v.trim().is_empty() {
            cfg.vault_root = v;
        }
    }
    if let Ok(v) = std::env::var("VAULT_ENV_COMPANION_URL") {
        if !v.trim().is_empty() {
            cfg.companion.base_url = v;
        }
    }
    if let Ok(v) = std::env::var("VAULT_ENV_CHAT_PLATFORM") {
        if !v.trim().is_empty() {
            cfg.chat_model_platform_key = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_path_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
smart_connections_folder = "data"
folder_exclusions = "Archive"

[companion]
enabled = false
"#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.smart_connections_folder, "data");
        assert_eq!(cfg.folder_exclusions, "Archive");
        assert!(!cfg.companion.enabled);
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "enable_mobile = \"maybe\"").unwrap();

        let err = load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse config"));
    }
}
