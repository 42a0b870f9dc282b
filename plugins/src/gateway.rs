//! Loopback WebSocket gateway serving environment status snapshots.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use vault_env_core::api::{SocketGateway, StatusSource};

pub const GATEWAY_HOST: &str = "127.0.0.1";

#[derive(Clone)]
struct GatewayState {
    status: Arc<dyn StatusSource>,
}

struct Running {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Answers every text frame with the current status as JSON.
pub struct StatusGateway {
    port: u16,
    running: Mutex<Option<Running>>,
}

impl StatusGateway {
    /// Port 0 binds an ephemeral port; see `local_addr`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            running: Mutex::new(None),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|r| r.addr)
    }
}

fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state.status))
}

async fn serve_socket(mut socket: WebSocket, status: Arc<dyn StatusSource>) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(_) => {
                let reply = match status.status().await {
                    Some(snapshot) => serde_json::to_string(&snapshot).unwrap_or_else(|e| {
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }),
                    None => serde_json::json!({ "error": "environment unloaded" }).to_string(),
                };
                if socket.send(Message::Text(reply)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

#[async_trait]
impl SocketGateway for StatusGateway {
    async fn start(&self, status: Arc<dyn StatusSource>) -> anyhow::Result<()> {
        self.unload().await;

        let addr: SocketAddr = format!("{GATEWAY_HOST}:{}", self.port).parse()?;
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown, mut shutdown_rx) = broadcast::channel(1);
        let app = create_router(GatewayState { status });

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await;
            if let Err(err) = served {
                tracing::warn!(
                    target: "vault_env.gateway",
                    stage = "gateway.serve",
                    error = %err
                );
            }
        });
        tracing::info!(
            target: "vault_env.gateway",
            stage = "gateway.start",
            addr = %addr
        );

        *self.running.lock().unwrap_or_else(|e| e.into_inner()) = Some(Running {
            addr,
            shutdown,
            task,
        });
        Ok(())
    }

    async fn unload(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(running) = running {
            let _ = running.shutdown.send(());
            running.task.abort();
            tracing::info!(
                target: "vault_env.gateway",
                stage = "gateway.unload",
                addr = %running.addr
            );
        }
    }
}
