#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use vault_env_core::api::{
    ActionsRegistry, Block, ChatFactory, ChatModel, ChatStore, Chunker, ChunkerFactory, Clock,
    Collection, CollectionFactory, CollectionPair, ConfigSnapshot, EmbedModel, EmbedModelLoader,
    EmbedSlot, EnvConfig, Environment, HostPlatform, HostServices, HttpMethod, HttpRequest,
    HttpResponse, ImportOutcome, ImportSlot, ImportStrategy, LifecyclePolicies, NoticeOptions,
    NoticeService, RequestAdapter, SocketGateway, StaticConfigSource, StatusSource,
    SyncStatusProvider, UiContainer, UiContainerProvider, BLOCKS, SOURCES,
};
use vault_env_core::wait::RecordingClock;

/// Counts of side effects observed across every fake a harness hands out.
#[derive(Default)]
pub struct Counters {
    pub builds: AtomicUsize,
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub saves: AtomicUsize,
    pub local_imports: AtomicUsize,
    pub embed_loads: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct LocalImport {
    counters: Arc<Counters>,
}

#[async_trait]
impl ImportStrategy for LocalImport {
    fn name(&self) -> &str {
        "local"
    }

    async fn import(&self, _collection: &str) -> anyhow::Result<ImportOutcome> {
        self.counters.local_imports.fetch_add(1, Ordering::SeqCst);
        Ok(ImportOutcome::Local {
            sources: 0,
            blocks: 0,
        })
    }
}

pub struct FakeCollection {
    name: &'static str,
    counters: Arc<Counters>,
    embed: EmbedSlot,
    import: ImportSlot,
    fail_save: bool,
    pub unloaded: AtomicBool,
}

#[async_trait]
impl Collection for FakeCollection {
    fn name(&self) -> &str {
        self.name
    }

    fn merge_defaults(&self) {}

    async fn load(&self) -> anyhow::Result<()> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save(&self) -> anyhow::Result<()> {
        self.counters.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            anyhow::bail!("disk full");
        }
        Ok(())
    }

    async fn unload(&self) {
        self.counters.unloads.fetch_add(1, Ordering::SeqCst);
        self.unloaded.store(true, Ordering::SeqCst);
        self.embed.clear();
    }

    fn attach_embed_model(&self, model: Arc<dyn EmbedModel>) {
        self.embed.set(model);
    }

    fn embed_model(&self) -> Option<Arc<dyn EmbedModel>> {
        self.embed.get()
    }

    fn import_strategy(&self) -> Arc<dyn ImportStrategy> {
        self.import.get()
    }

    fn set_import_strategy(&self, strategy: Arc<dyn ImportStrategy>) {
        self.import.set(strategy);
    }
}

pub struct FakeFactory {
    counters: Arc<Counters>,
    pub built: Mutex<Vec<CollectionPair>>,
    pub fail_sources_save: bool,
}

impl FakeFactory {
    pub fn built(&self) -> Vec<CollectionPair> {
        self.built.lock().unwrap().clone()
    }
}

impl CollectionFactory for FakeFactory {
    fn build(
        &self,
        _snapshot: &ConfigSnapshot,
        _chunker: Option<Arc<dyn Chunker>>,
    ) -> anyhow::Result<CollectionPair> {
        self.counters.builds.fetch_add(1, Ordering::SeqCst);
        let local: Arc<dyn ImportStrategy> = Arc::new(LocalImport {
            counters: self.counters.clone(),
        });
        let make = |name: &'static str, fail_save: bool| {
            Arc::new(FakeCollection {
                name,
                counters: self.counters.clone(),
                embed: EmbedSlot::default(),
                import: ImportSlot::new(local.clone()),
                fail_save,
                unloaded: AtomicBool::new(false),
            })
        };
        let pair = CollectionPair::new(
            make(SOURCES, self.fail_sources_save),
            make(BLOCKS, false),
        );
        self.built.lock().unwrap().push(pair.clone());
        Ok(pair)
    }
}

pub struct FakeEmbedModel {
    key: String,
}

impl EmbedModel for FakeEmbedModel {
    fn model_key(&self) -> &str {
        &self.key
    }

    fn dims(&self) -> Option<usize> {
        Some(384)
    }
}

pub struct FakeEmbedLoader {
    counters: Arc<Counters>,
    fail: bool,
}

#[async_trait]
impl EmbedModelLoader for FakeEmbedLoader {
    async fn load(&self, model_key: &str) -> anyhow::Result<Arc<dyn EmbedModel>> {
        self.counters.embed_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("model weights missing");
        }
        Ok(Arc::new(FakeEmbedModel {
            key: model_key.to_string(),
        }))
    }
}

pub struct WholeDocChunker;

impl Chunker for WholeDocChunker {
    fn chunk(&self, content: &str) -> Vec<Block> {
        vec![Block {
            key: "#".to_string(),
            text: content.to_string(),
            line_start: 1,
            line_end: content.lines().count(),
        }]
    }
}

pub struct WholeDocChunkerFactory;

impl ChunkerFactory for WholeDocChunkerFactory {
    fn build(&self, _snapshot: &ConfigSnapshot) -> anyhow::Result<Arc<dyn Chunker>> {
        Ok(Arc::new(WholeDocChunker))
    }
}

/// Reports syncing for the first `blocking_polls` reads, then idle.
pub struct ScriptedSync {
    blocking_polls: usize,
    polls: AtomicUsize,
}

impl ScriptedSync {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl SyncStatusProvider for ScriptedSync {
    fn status_text(&self) -> String {
        "Syncing".to_string()
    }

    fn is_syncing(&self) -> bool {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        n < self.blocking_polls
    }
}

/// Keeps every show and remove in order as `show:<id>` / `remove:<id>`.
#[derive(Default)]
pub struct RecordingNotices {
    log: Mutex<Vec<String>>,
}

impl RecordingNotices {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn shows(&self, id: &str) -> usize {
        let entry = format!("show:{id}");
        self.log().iter().filter(|e| **e == entry).count()
    }
}

impl NoticeService for RecordingNotices {
    fn show(&self, id: &str, _lines: Vec<String>, _options: NoticeOptions) {
        self.log.lock().unwrap().push(format!("show:{id}"));
    }

    fn remove(&self, id: &str) {
        self.log.lock().unwrap().push(format!("remove:{id}"));
    }
}

/// Companion stand-in. `health: None` refuses the connection.
#[derive(Default)]
pub struct CompanionScript {
    health: Option<u16>,
    replies: Mutex<VecDeque<&'static str>>,
    posts: AtomicUsize,
}

impl CompanionScript {
    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestAdapter for CompanionScript {
    async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        match request.method {
            HttpMethod::Get => match self.health {
                Some(status) => Ok(HttpResponse {
                    status,
                    body: String::new(),
                }),
                None => anyhow::bail!("connection refused"),
            },
            HttpMethod::Post => {
                self.posts.fetch_add(1, Ordering::SeqCst);
                let message = self
                    .replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or("recently imported");
                Ok(HttpResponse {
                    status: 200,
                    body: serde_json::json!({ "message": message }).to_string(),
                })
            }
        }
    }
}

pub struct ReadyUi;

impl UiContainerProvider for ReadyUi {
    fn container(&self) -> Option<UiContainer> {
        Some(UiContainer {
            id: "chat-view".to_string(),
        })
    }
}

pub struct NoActions;

impl ActionsRegistry for NoActions {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn action_names(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct FixedSessions(pub usize);

#[async_trait]
impl ChatStore for FixedSessions {
    async fn load_all(&self) -> anyhow::Result<usize> {
        Ok(self.0)
    }
}

pub struct FakeChat;

impl ChatFactory for FakeChat {
    fn actions(&self) -> Arc<dyn ActionsRegistry> {
        Arc::new(NoActions)
    }

    fn open(
        &self,
        _container: &UiContainer,
        _model: Option<Arc<ChatModel>>,
    ) -> anyhow::Result<Arc<dyn ChatStore>> {
        Ok(Arc::new(FixedSessions(3)))
    }
}

/// Gateway that only records whether it is serving.
#[derive(Default)]
pub struct RecordingGateway {
    running: AtomicBool,
    starts: AtomicUsize,
    unloads: AtomicUsize,
}

impl RecordingGateway {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketGateway for RecordingGateway {
    async fn start(&self, _status: Arc<dyn StatusSource>) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

/// A clock whose sleeps block until the test releases them.
pub struct GatedClock {
    sleeps: AtomicUsize,
    permits: Semaphore,
}

impl GatedClock {
    pub fn new() -> Self {
        Self {
            sleeps: AtomicUsize::new(0),
            permits: Semaphore::new(0),
        }
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Yield until at least `n` sleeps have started.
    pub async fn wait_for_sleeps(&self, n: usize) {
        while self.sleeps() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Clock for GatedClock {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Config with the gateway off so tests never bind a port.
pub fn test_config() -> EnvConfig {
    let mut cfg = EnvConfig::default();
    cfg.gateway.enabled = false;
    cfg
}

pub struct Harness {
    pub counters: Arc<Counters>,
    pub factory: Arc<FakeFactory>,
    pub notices: Arc<RecordingNotices>,
    pub companion: Arc<CompanionScript>,
    pub sync: Option<Arc<ScriptedSync>>,
    pub clock: Arc<dyn Clock>,
    pub recording: RecordingClock,
    pub gateway: Option<Arc<RecordingGateway>>,
    pub failing_embed_loader: bool,
    pub is_mobile: bool,
}

impl Harness {
    pub fn new() -> Self {
        let counters = Arc::new(Counters::default());
        let recording = RecordingClock::new();
        Self {
            factory: Arc::new(FakeFactory {
                counters: counters.clone(),
                built: Mutex::new(Vec::new()),
                fail_sources_save: false,
            }),
            counters,
            notices: Arc::new(RecordingNotices::default()),
            companion: Arc::new(CompanionScript::default()),
            sync: None,
            clock: Arc::new(recording.clone()),
            recording,
            gateway: None,
            failing_embed_loader: false,
            is_mobile: false,
        }
    }

    pub fn with_sync_blocking(mut self, blocking_polls: usize) -> Self {
        self.sync = Some(Arc::new(ScriptedSync {
            blocking_polls,
            polls: AtomicUsize::new(0),
        }));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_companion(mut self, health: Option<u16>, replies: &[&'static str]) -> Self {
        self.companion = Arc::new(CompanionScript {
            health,
            replies: Mutex::new(replies.iter().copied().collect()),
            posts: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_failing_sources_save(mut self) -> Self {
        self.factory = Arc::new(FakeFactory {
            counters: self.counters.clone(),
            built: Mutex::new(Vec::new()),
            fail_sources_save: true,
        });
        self
    }

    /// Attach a recording gateway. Pair with `gateway.enabled = true` in the config.
    pub fn with_gateway(mut self) -> Self {
        self.gateway = Some(Arc::new(RecordingGateway::default()));
        self
    }

    pub fn with_failing_embed_loader(mut self) -> Self {
        self.failing_embed_loader = true;
        self
    }

    pub fn mobile(mut self) -> Self {
        self.is_mobile = true;
        self
    }

    pub fn services(&self, config: &EnvConfig) -> HostServices {
        HostServices {
            collections: self.factory.clone(),
            embed_loader: Arc::new(FakeEmbedLoader {
                counters: self.counters.clone(),
                fail: self.failing_embed_loader,
            }),
            chunker: Arc::new(WholeDocChunkerFactory),
            sync_status: self
                .sync
                .clone()
                .map(|s| s as Arc<dyn SyncStatusProvider>),
            notices: self.notices.clone(),
            request: self.companion.clone(),
            ui: Arc::new(ReadyUi),
            chat: Arc::new(FakeChat),
            gateway: self
                .gateway
                .clone()
                .map(|g| g as Arc<dyn SocketGateway>),
            config_source: Arc::new(StaticConfigSource(config.clone())),
            clock: self.clock.clone(),
            platform: HostPlatform {
                is_mobile: self.is_mobile,
            },
        }
    }

    pub fn environment(&self, config: EnvConfig) -> Environment {
        let services = self.services(&config);
        Environment::with_policies(config, services, LifecyclePolicies::default())
    }
}
