use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use vault_env_core::api::{
    ChatFactory, EnvConfig, NoticeService, RequestAdapter, SocketGateway, SyncStatusProvider,
};

use crate::chat::JsonChatFactory;
use crate::gateway::StatusGateway;
use crate::http_client::ReqwestRequestAdapter;
use crate::notices::LogNotices;
use crate::sync_status::FileSyncStatus;
use crate::vault;

pub fn build_request(_cfg: &EnvConfig) -> Result<Arc<dyn RequestAdapter>> {
    Ok(Arc::new(ReqwestRequestAdapter::new(None)?))
}

/// No provider unless a status file is configured. Relative paths resolve
/// against the vault root.
pub fn build_sync_status(cfg: &EnvConfig) -> Option<Arc<dyn SyncStatusProvider>> {
    let raw = cfg.sync.status_file.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let expanded = shellexpand::tilde(raw).into_owned();
    let path = PathBuf::from(expanded);
    let path = if path.is_absolute() {
        path
    } else {
        vault::vault_root(cfg).join(path)
    };
    Some(Arc::new(FileSyncStatus::new(path)))
}

pub fn build_gateway(cfg: &EnvConfig) -> Option<Arc<dyn SocketGateway>> {
    if !cfg.gateway.enabled {
        return None;
    }
    Some(Arc::new(StatusGateway::new(cfg.gateway.port)))
}

pub fn build_notices(cfg: &EnvConfig) -> Arc<dyn NoticeService> {
    Arc::new(LogNotices::new(cfg.notices.muted.clone()))
}

pub fn build_chat(cfg: &EnvConfig) -> Arc<dyn ChatFactory> {
    Arc::new(JsonChatFactory::new(vault::data_dir(cfg).join("chats")))
}
