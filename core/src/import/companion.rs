//! Companion service bridge: health probe plus the delegating import poll loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{EntityReloader, ImportOutcome, ImportStrategy};
use crate::http::{HttpRequest, RequestAdapter};
use crate::notice::{NoticeOptions, NoticeService};
use crate::wait::{CancelToken, Clock, WaitError, WaitPolicy};

/// Message the companion sends once nothing is left to import.
pub const RECENTLY_IMPORTED: &str = "recently imported";
pub const IMPORTING_NOTICE: &str = "importing from companion";
pub const IMPORTED_NOTICE: &str = "imported from companion";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompanionReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub notice: Option<String>,
}

impl CompanionReply {
    pub fn is_done(&self) -> bool {
        self.message == RECENTLY_IMPORTED
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("[Companion] {}", self.message)];
        if let Some(notice) = self.notice.as_ref().filter(|n| !n.trim().is_empty()) {
            lines.push(notice.clone());
        }
        lines
    }
}

pub struct CompanionBridge {
    request: Arc<dyn RequestAdapter>,
    url_health: String,
    url_import: String,
    probe_timeout: Duration,
}

impl CompanionBridge {
    pub fn new(request: Arc<dyn RequestAdapter>, base_url: &str, probe_timeout: Duration) -> Self {
        let normalized = base_url.trim_end_matches('/');
        Self {
            request,
            url_health: format!("{}/", normalized),
            url_import: format!("{}/import_entities", normalized),
            probe_timeout,
        }
    }

    /// True only on HTTP 200. Every failure is logged and reported as absent.
    pub async fn probe(&self) -> bool {
        let req = HttpRequest::get(&self.url_health).with_timeout(self.probe_timeout);
        match self.request.send(req).await {
            Ok(resp) if resp.status == 200 => {
                tracing::info!(
                    target: "vault_env.import",
                    stage = "companion.probe",
                    url = %self.url_health,
                    "local companion service found"
                );
                true
            }
            Ok(resp) => {
                tracing::info!(
                    target: "vault_env.import",
                    stage = "companion.probe",
                    url = %self.url_health,
                    status = resp.status,
                    "companion service answered without 200, keeping local import"
                );
                false
            }
            Err(err) => {
                tracing::info!(
                    target: "vault_env.import",
                    stage = "companion.probe",
                    url = %self.url_health,
                    error = %err,
                    "could not connect to companion service"
                );
                false
            }
        }
    }

    pub async fn trigger(&self) -> anyhow::Result<CompanionReply> {
        let resp = self
            .request
            .send(HttpRequest::post(&self.url_import))
            .await?;
        if !resp.is_success() {
            anyhow::bail!(
                "companion import trigger failed: status={} url={}",
                resp.status,
                self.url_import
            );
        }
        let reply: CompanionReply = resp.json()?;
        tracing::debug!(
            target: "vault_env.import",
            stage = "companion.trigger",
            message = %reply.message
        );
        Ok(reply)
    }
}

/// Import strategy that asks the companion to import and polls until it is done,
/// then reloads the collections once.
pub struct RemoteImport {
    bridge: Arc<CompanionBridge>,
    notices: Arc<dyn NoticeService>,
    clock: Arc<dyn Clock>,
    policy: WaitPolicy,
    cancel: CancelToken,
    reloader: Arc<dyn EntityReloader>,
}

impl RemoteImport {
    pub fn new(
        bridge: Arc<CompanionBridge>,
        notices: Arc<dyn NoticeService>,
        clock: Arc<dyn Clock>,
        policy: WaitPolicy,
        cancel: CancelToken,
        reloader: Arc<dyn EntityReloader>,
    ) -> Self {
        Self {
            bridge,
            notices,
            clock,
            policy,
            cancel,
            reloader,
        }
    }

    async fn poll_until_done(
        &self,
        mut cancel: CancelToken,
    ) -> anyhow::Result<(CompanionReply, u32)> {
        let mut polls: u32 = 1;
        let mut waited = Duration::ZERO;
        loop {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled {
                    what: "companion import",
                }
                .into());
            }
            if let Some(limit) = self.policy.timeout {
                if waited >= limit {
                    return Err(WaitError::TimedOut {
                        what: "companion import",
                        waited,
                    }
                    .into());
                }
            }
            tokio::select! {
                _ = self.clock.sleep(self.policy.interval) => {}
                _ = cancel.cancelled() => {
                    return Err(WaitError::Cancelled { what: "companion import" }.into());
                }
            }
            waited += self.policy.interval;

            let reply = self.bridge.trigger().await?;
            polls += 1;
            if reply.is_done() {
                return Ok((reply, polls));
            }
            self.notices.remove(IMPORTING_NOTICE);
            self.notices
                .show(IMPORTING_NOTICE, reply.lines(), NoticeOptions::default());
        }
    }
}

#[async_trait]
impl ImportStrategy for RemoteImport {
    fn name(&self) -> &str {
        "companion"
    }

    async fn import(&self, collection: &str) -> anyhow::Result<ImportOutcome> {
        tracing::info!(
            target: "vault_env.import",
            stage = "companion.import.in",
            collection = %collection
        );
        let first = self.bridge.trigger().await?;
        if first.is_done() {
            self.notices
                .show(IMPORTED_NOTICE, first.lines(), NoticeOptions::default());
            return Ok(ImportOutcome::AlreadyCurrent);
        }

        self.notices
            .show(IMPORTING_NOTICE, first.lines(), NoticeOptions::default());
        let (last, polls) = match self.poll_until_done(self.cancel.clone()).await {
            Ok(done) => done,
            Err(err) => {
                self.notices.remove(IMPORTING_NOTICE);
                return Err(err);
            }
        };

        self.notices.remove(IMPORTING_NOTICE);
        self.notices
            .show(IMPORTED_NOTICE, last.lines(), NoticeOptions::default());
        tracing::info!(
            target: "vault_env.import",
            stage = "companion.import.out",
            polls = polls
        );

        if let Err(err) = self.reloader.reload_entities().await {
            tracing::warn!(
                target: "vault_env.import",
                stage = "companion.reload",
                error = %err,
                "reload after companion import failed"
            );
        }
        Ok(ImportOutcome::Delegated { polls })
    }
}
