//! The environment: owns the collections, models, chat subsystem and gateway,
//! and sequences their initialization and teardown.

mod chat;
mod entities;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::chunk::Chunker;
use crate::collection::{CollectionPair, SaveReport};
use crate::config::{ConfigSnapshot, EnvConfig, Exclusions};
use crate::context::HostServices;
use crate::conversation::ChatSubsystem;
use crate::error::EnvError;
use crate::gateway::{EnvStatus, StatusSource};
use crate::import::EntityReloader;
use crate::model::{ChatModel, EmbedModelRegistry};
use crate::notice::NoticeOptions;
use crate::state::{
    EntityLifecycle, EntityPhase, EnvPhase, StateEvent, StateManager, StateTransition,
};
use crate::wait::{
    CancelSource, WaitPolicy, IMPORT_POLL_INTERVAL, SYNC_GATE_INTERVAL, UI_CONTAINER_INTERVAL,
};

pub use entities::EntitiesOutcome;

pub const MOBILE_DISABLED_NOTICE: &str = "mobile disabled";

/// Poll intervals and default bounds for the three waits the lifecycle performs.
///
/// A timeout set in configuration takes precedence over the one here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicies {
    pub sync_gate: WaitPolicy,
    pub ui_container: WaitPolicy,
    pub import_poll: WaitPolicy,
}

impl Default for LifecyclePolicies {
    fn default() -> Self {
        Self {
            sync_gate: WaitPolicy::unbounded(SYNC_GATE_INTERVAL),
            ui_container: WaitPolicy::unbounded(UI_CONTAINER_INTERVAL),
            import_poll: WaitPolicy::unbounded(IMPORT_POLL_INTERVAL),
        }
    }
}

impl LifecyclePolicies {
    pub fn sync_gate_for(&self, cfg: &EnvConfig) -> WaitPolicy {
        merge_timeout(self.sync_gate, cfg.lifecycle.sync_gate_timeout())
    }

    pub fn ui_container_for(&self, cfg: &EnvConfig) -> WaitPolicy {
        merge_timeout(self.ui_container, cfg.lifecycle.ui_container_timeout())
    }

    pub fn import_poll_for(&self, cfg: &EnvConfig) -> WaitPolicy {
        let configured = cfg.companion.import_timeout_ms.map(Duration::from_millis);
        merge_timeout(self.import_poll, configured)
    }
}

fn merge_timeout(policy: WaitPolicy, configured: Option<Duration>) -> WaitPolicy {
    let timeout = configured.or(policy.timeout);
    policy.with_timeout(timeout)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitReport {
    Ready {
        entities: EntitiesOutcome,
        import_started: bool,
        chat_sessions: usize,
    },
    /// Mobile host with mobile support switched off; nothing was initialized.
    MobileDisabled,
}

struct EnvInner {
    host: HostServices,
    policies: LifecyclePolicies,
    snapshot: RwLock<Arc<ConfigSnapshot>>,
    lifecycle: StateManager,
    entities: EntityLifecycle,
    collections: RwLock<Option<CollectionPair>>,
    embed_models: EmbedModelRegistry,
    chunker: RwLock<Option<Arc<dyn Chunker>>>,
    chat_model: RwLock<Option<Arc<ChatModel>>>,
    chat: RwLock<Option<ChatSubsystem>>,
    gateway_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancelSource,
    /// Bumped by every teardown. Background work tagged with an older value is stale.
    epoch: AtomicU64,
}

/// Cheap to clone; all clones share one environment.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl Environment {
    pub fn new(config: EnvConfig, host: HostServices) -> Self {
        Self::with_policies(config, host, LifecyclePolicies::default())
    }

    pub fn with_policies(
        config: EnvConfig,
        host: HostServices,
        policies: LifecyclePolicies,
    ) -> Self {
        Self {
            inner: Arc::new(EnvInner {
                host,
                policies,
                snapshot: RwLock::new(Arc::new(ConfigSnapshot::new(config))),
                lifecycle: StateManager::new(),
                entities: EntityLifecycle::new(),
                collections: RwLock::new(None),
                embed_models: EmbedModelRegistry::new(),
                chunker: RwLock::new(None),
                chat_model: RwLock::new(None),
                chat: RwLock::new(None),
                gateway_task: Mutex::new(None),
                cancel: CancelSource::new(),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Non-owning handle tied to the current epoch. Reloads requested through
    /// it are skipped once the environment has been torn down since.
    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment {
            inner: Arc::downgrade(&self.inner),
            epoch: self.epoch(),
        }
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.inner.snapshot.read().await.clone()
    }

    pub async fn exclusions(&self) -> Exclusions {
        self.snapshot().await.exclusions().clone()
    }

    pub async fn phase(&self) -> EnvPhase {
        self.inner.lifecycle.phase().await
    }

    pub fn entity_phase(&self) -> EntityPhase {
        self.inner.entities.phase()
    }

    pub fn entities_loaded(&self) -> bool {
        self.inner.entities.is_loaded()
    }

    pub async fn collections(&self) -> Option<CollectionPair> {
        self.inner.collections.read().await.clone()
    }

    pub fn embed_models(&self) -> &EmbedModelRegistry {
        &self.inner.embed_models
    }

    pub async fn chat_model(&self) -> Option<Arc<ChatModel>> {
        self.inner.chat_model.read().await.clone()
    }

    pub async fn chat_sessions(&self) -> Option<usize> {
        self.inner.chat.read().await.as_ref().map(|c| c.sessions)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.lifecycle.subscribe()
    }

    /// Abort every wait currently in progress. Waits started afterwards are unaffected.
    pub fn cancel_pending(&self) {
        tracing::info!(target: "vault_env.lifecycle", stage = "lifecycle.cancel");
        self.inner.cancel.cancel();
    }

    pub async fn status(&self) -> EnvStatus {
        let phase = self.phase().await;
        EnvStatus {
            phase,
            entities: self.inner.entities.phase(),
            entities_loaded: self.inner.entities.is_loaded(),
            busy: StateTransition::is_busy(phase),
            generation: self.inner.entities.generation(),
            embed_models: self.inner.embed_models.len().await,
            chat_sessions: self.chat_sessions().await,
        }
    }

    /// Bring the environment up: chunker, chat model, gateway, collections,
    /// background import, then the chat subsystem.
    ///
    /// On failure everything built so far is torn down and the phase returns to `Idle`.
    pub async fn init(&self) -> Result<InitReport, EnvError> {
        self.inner.lifecycle.transition(EnvPhase::Initializing).await?;
        self.run_init().await
    }

    async fn run_init(&self) -> Result<InitReport, EnvError> {
        let snapshot = self.snapshot().await;
        if self.inner.host.platform.is_mobile && !snapshot.config().enable_mobile {
            tracing::info!(target: "vault_env.lifecycle", stage = "init.mobile_disabled");
            self.inner.host.notices.show(
                MOBILE_DISABLED_NOTICE,
                vec!["Smart Environment is disabled on mobile. Enable it in settings.".to_string()],
                NoticeOptions::default(),
            );
            self.inner.lifecycle.transition(EnvPhase::Idle).await?;
            return Ok(InitReport::MobileDisabled);
        }

        match self.init_stages(&snapshot).await {
            Ok(report) => {
                self.inner.lifecycle.transition(EnvPhase::Ready).await?;
                Ok(report)
            }
            Err(err) => {
                tracing::error!(
                    target: "vault_env.lifecycle",
                    stage = "init.failed",
                    error = %err
                );
                self.teardown().await;
                if let Err(transition) = self.inner.lifecycle.transition(EnvPhase::Idle).await {
                    tracing::warn!(
                        target: "vault_env.lifecycle",
                        error = %transition,
                        "could not return to idle after failed init"
                    );
                }
                Err(err)
            }
        }
    }

    async fn init_stages(&self, snapshot: &ConfigSnapshot) -> Result<InitReport, EnvError> {
        self.init_chunker().await?;
        self.init_chat_model(None).await;
        self.start_gateway(snapshot).await;

        let entities = self.init_entities().await?;
        let import_started = self.init_import().await.is_some();
        let chat_sessions = self.init_chat().await?;

        Ok(InitReport::Ready {
            entities,
            import_started,
            chat_sessions,
        })
    }

    /// Build the chunker from the current exclusions. Collections built
    /// afterwards split sources into blocks with it.
    pub async fn init_chunker(&self) -> Result<(), EnvError> {
        let snapshot = self.snapshot().await;
        let chunker = self
            .inner
            .host
            .chunker
            .build(&snapshot)
            .map_err(EnvError::Plugin)?;
        *self.inner.chunker.write().await = Some(chunker);
        Ok(())
    }

    async fn start_gateway(&self, snapshot: &ConfigSnapshot) {
        if !snapshot.config().gateway.enabled {
            return;
        }
        let Some(gateway) = self.inner.host.gateway.clone() else {
            return;
        };
        let status: Arc<dyn StatusSource> = Arc::new(self.downgrade());
        let task = tokio::spawn(async move {
            if let Err(err) = gateway.start(status).await {
                tracing::warn!(
                    target: "vault_env.gateway",
                    stage = "gateway.start",
                    error = %err,
                    "socket gateway failed to start"
                );
            }
        });
        if let Some(previous) = self.inner.gateway_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// Tear everything down. Safe to call repeatedly; rejected while a
    /// transition is in flight (call `cancel_pending` first).
    pub async fn unload(&self) -> Result<(), EnvError> {
        self.inner.lifecycle.transition(EnvPhase::Unloading).await?;
        self.teardown().await;
        self.inner.lifecycle.transition(EnvPhase::Idle).await?;
        Ok(())
    }

    async fn teardown(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.cancel.cancel();
        tracing::debug!(
            target: "vault_env.lifecycle",
            stage = "lifecycle.teardown",
            epoch = epoch
        );

        self.unload_entities().await;
        self.inner.embed_models.clear().await;

        // A start still in flight would bind after the unload below.
        let start = self.inner.gateway_task.lock().await.take();
        if let Some(start) = start {
            start.abort();
            start.await.ok();
        }
        if let Some(gateway) = &self.inner.host.gateway {
            gateway.unload().await;
        }
        *self.inner.chat.write().await = None;
        *self.inner.chat_model.write().await = None;
        *self.inner.chunker.write().await = None;
    }

    /// Unload, re-read configuration from the host, and initialize again.
    pub async fn reload(&self) -> Result<InitReport, EnvError> {
        self.inner.lifecycle.transition(EnvPhase::Reloading).await?;
        self.teardown().await;

        match self.inner.host.config_source.current() {
            Ok(config) => {
                *self.inner.snapshot.write().await = Arc::new(ConfigSnapshot::new(config));
            }
            Err(err) => {
                self.inner.lifecycle.transition(EnvPhase::Idle).await?;
                return Err(EnvError::Config(err.to_string()));
            }
        }

        self.inner.lifecycle.transition(EnvPhase::Initializing).await?;
        self.run_init().await
    }

    /// Save both collections. Failures are logged and reported, not raised.
    pub async fn save(&self) -> SaveReport {
        match self.collections().await {
            Some(pair) => pair.save().await,
            None => SaveReport::default(),
        }
    }

    fn emit(&self, event: StateEvent) {
        self.inner.lifecycle.emit(event);
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

/// Non-owning handle, held by background tasks and the gateway.
#[derive(Clone)]
pub struct WeakEnvironment {
    inner: Weak<EnvInner>,
    epoch: u64,
}

impl WeakEnvironment {
    pub fn upgrade(&self) -> Option<Environment> {
        self.inner.upgrade().map(|inner| Environment { inner })
    }

    /// False once the environment is dropped or torn down after this handle was taken.
    pub fn is_current(&self) -> bool {
        self.upgrade().is_some_and(|env| env.epoch() == self.epoch)
    }
}

#[async_trait]
impl EntityReloader for WeakEnvironment {
    async fn reload_entities(&self) -> anyhow::Result<()> {
        let env = self
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("environment dropped"))?;
        if env.epoch() != self.epoch {
            tracing::info!(
                target: "vault_env.entities",
                stage = "entities.reload.stale",
                epoch = self.epoch,
                current = env.epoch(),
                "environment was torn down since this reload was requested, skipping"
            );
            return Ok(());
        }
        env.reload_entities().await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSource for WeakEnvironment {
    async fn status(&self) -> Option<EnvStatus> {
        match self.upgrade() {
            Some(env) => Some(env.status().await),
            None => None,
        }
    }
}
