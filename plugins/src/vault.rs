//! Vault path resolution shared by the filesystem-backed collaborators.

use std::path::{Path, PathBuf};

use vault_env_core::api::EnvConfig;

/// `vault_root` with `~` and environment variables expanded.
pub fn vault_root(cfg: &EnvConfig) -> PathBuf {
    let expanded = shellexpand::full(&cfg.vault_root)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| cfg.vault_root.clone());
    PathBuf::from(expanded)
}

/// `<vault_root>/<smart_connections_folder>`
pub fn data_dir(cfg: &EnvConfig) -> PathBuf {
    vault_root(cfg).join(cfg.smart_connections_folder.trim_matches('/'))
}

/// Vault-relative path with `/` separators, or `None` if `path` is outside the vault.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
