use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{Environment, WeakEnvironment};
use crate::collection::CollectionPair;
use crate::error::EnvError;
use crate::import::{CompanionBridge, ImportStrategy, RemoteImport};
use crate::state::{Completion, StateEvent};
use crate::sync_gate::SyncGate;
use crate::wait::{wait_until, CancelToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitiesOutcome {
    Loaded { generation: u64 },
    /// Another initialization was already running; this call did nothing.
    AlreadyInitializing,
    /// The entities were unloaded while this initialization was in flight;
    /// whatever it built has been discarded.
    Superseded,
}

impl Environment {
    /// Wait for sync to settle, then build, bind and load a fresh collection pair.
    pub async fn init_entities(&self) -> Result<EntitiesOutcome, EnvError> {
        let Some(generation) = self.inner.entities.try_begin() else {
            tracing::info!(
                target: "vault_env.entities",
                stage = "entities.init",
                "initialization already in progress"
            );
            return Ok(EntitiesOutcome::AlreadyInitializing);
        };
        tracing::info!(
            target: "vault_env.entities",
            stage = "entities.init.in",
            generation = generation
        );

        let pair = match self.build_entities(generation).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                self.inner.entities.fail(generation);
                return Ok(EntitiesOutcome::Superseded);
            }
            Err(err) => {
                self.inner.entities.fail(generation);
                return Err(err);
            }
        };

        let mut slot = self.inner.collections.write().await;
        match self.inner.entities.complete(generation) {
            Completion::Current => {
                *slot = Some(pair);
                drop(slot);
                tracing::info!(
                    target: "vault_env.entities",
                    stage = "entities.init.out",
                    generation = generation
                );
                self.emit(StateEvent::EntitiesLoaded {
                    generation,
                    timestamp: Self::now(),
                });
                Ok(EntitiesOutcome::Loaded { generation })
            }
            Completion::Stale => {
                drop(slot);
                tracing::info!(
                    target: "vault_env.entities",
                    stage = "entities.init.stale",
                    generation = generation,
                    "discarding collections built for a superseded generation"
                );
                pair.unload().await;
                Ok(EntitiesOutcome::Superseded)
            }
        }
    }

    async fn build_entities(&self, generation: u64) -> Result<Option<CollectionPair>, EnvError> {
        let host = &self.inner.host;
        let gate = SyncGate::new(host.sync_status.clone());
        let policy = self
            .inner
            .policies
            .sync_gate_for(self.snapshot().await.config());
        let mut cancel = self.inner.cancel.token();

        let polls = wait_until(
            host.clock.as_ref(),
            policy,
            &mut cancel,
            "sync gate",
            || {
                let blocking = gate.is_blocking();
                if blocking {
                    tracing::info!(
                        target: "vault_env.entities",
                        stage = "entities.sync_gate",
                        "waiting for sync to finish"
                    );
                }
                !blocking
            },
        )
        .await?;
        tracing::debug!(
            target: "vault_env.entities",
            stage = "entities.sync_gate",
            polls = polls
        );

        if !self.inner.entities.is_current(generation) {
            return Ok(None);
        }

        let snapshot = self.snapshot().await;
        let chunker = self.inner.chunker.read().await.clone();
        let pair = host
            .collections
            .build(&snapshot, chunker)
            .map_err(|e| EnvError::collection("collection pair", e))?;
        pair.merge_defaults();
        pair.bind_embed_model(
            &self.inner.embed_models,
            host.embed_loader.as_ref(),
            &snapshot.config().embed_model_key,
        )
        .await?;
        pair.load().await?;
        Ok(Some(pair))
    }

    /// Drop the loaded collections. Any initialization still in flight
    /// becomes stale and discards its own result.
    pub async fn unload_entities(&self) {
        let pair = {
            let mut slot = self.inner.collections.write().await;
            self.inner.entities.invalidate();
            slot.take()
        };
        if let Some(pair) = pair {
            pair.unload().await;
            tracing::info!(target: "vault_env.entities", stage = "entities.unload");
            self.emit(StateEvent::EntitiesUnloaded {
                timestamp: Self::now(),
            });
        }
    }

    /// Swap in a freshly built pair.
    ///
    /// The embed model registry is left alone, so the new pair binds the same
    /// model instance by key instead of loading it again. `unload` and
    /// `reload` clear the registry.
    pub async fn reload_entities(&self) -> Result<EntitiesOutcome, EnvError> {
        tracing::info!(target: "vault_env.entities", stage = "entities.reload");
        self.unload_entities().await;
        if self.inner.entities.force_release() {
            tracing::debug!(
                target: "vault_env.entities",
                stage = "entities.reload",
                "released stale initialization"
            );
        }
        self.init_entities().await
    }

    /// Start the background import if the collections have an embed model.
    ///
    /// Uses the companion when it answers its health probe, otherwise the
    /// collections' own import strategy.
    ///
    /// The import is bound to the current epoch: a teardown cancels its polling
    /// and any reload it asks for afterwards is skipped.
    pub async fn init_import(&self) -> Option<JoinHandle<()>> {
        let handle = self.downgrade();
        let cancel = self.inner.cancel.token();
        let pair = self.collections().await?;
        if !pair.has_embed_model() {
            tracing::debug!(
                target: "vault_env.import",
                stage = "import.skip",
                "no embed model, skipping import"
            );
            return None;
        }
        let env = self.clone();
        Some(tokio::spawn(async move {
            env.run_import(pair, handle, cancel).await
        }))
    }

    async fn run_import(
        &self,
        pair: CollectionPair,
        handle: WeakEnvironment,
        cancel: CancelToken,
    ) {
        if !handle.is_current() {
            tracing::debug!(
                target: "vault_env.import",
                stage = "import.skip",
                "environment torn down before import started"
            );
            return;
        }
        let snapshot = self.snapshot().await;
        let cfg = snapshot.config();
        let host = &self.inner.host;

        if cfg.companion.enabled {
            let bridge = Arc::new(CompanionBridge::new(
                host.request.clone(),
                &cfg.companion.base_url,
                Duration::from_millis(cfg.companion.probe_timeout_ms),
            ));
            if bridge.probe().await {
                let remote: Arc<dyn ImportStrategy> = Arc::new(RemoteImport::new(
                    bridge,
                    host.notices.clone(),
                    host.clock.clone(),
                    self.inner.policies.import_poll_for(cfg),
                    cancel,
                    Arc::new(handle),
                ));
                pair.set_import_strategy(remote);
            }
        }

        let strategy = pair.sources().import_strategy().name().to_string();
        self.emit(StateEvent::ImportStarted {
            strategy: strategy.clone(),
            timestamp: Self::now(),
        });
        match pair.sources().import().await {
            Ok(outcome) => {
                tracing::info!(
                    target: "vault_env.import",
                    stage = "import.done",
                    strategy = %strategy,
                    outcome = %outcome
                );
                self.emit(StateEvent::ImportFinished {
                    strategy,
                    outcome: outcome.to_string(),
                    timestamp: Self::now(),
                });
            }
            Err(err) => {
                tracing::warn!(
                    target: "vault_env.import",
                    stage = "import.failed",
                    strategy = %strategy,
                    error = %err
                );
            }
        }
    }
}
