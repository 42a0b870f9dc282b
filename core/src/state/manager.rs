//! Environment phase holder and event broadcaster.

use super::transitions::{StateTransition, TransitionError};
use super::types::{EnvPhase, StateEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

#[derive(Clone)]
pub struct StateManager {
    inner: Arc<StateManagerInner>,
}

struct StateManagerInner {
    phase: RwLock<EnvPhase>,
    event_tx: broadcast::Sender<StateEvent>,
}

impl StateManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);

        let inner = StateManagerInner {
            phase: RwLock::new(EnvPhase::Idle),
            event_tx,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Send an event; having no subscribers is not an error.
    pub fn emit(&self, event: StateEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    pub async fn phase(&self) -> EnvPhase {
        *self.inner.phase.read().await
    }

    /// Check and apply a phase change under one write lock. Returns the old phase.
    pub async fn transition(&self, new_phase: EnvPhase) -> Result<EnvPhase, TransitionError> {
        let old_phase = {
            let mut phase = self.inner.phase.write().await;
            let old_phase = *phase;
            StateTransition::validate(old_phase, new_phase)?;
            *phase = new_phase;
            old_phase
        };

        tracing::debug!(
            target: "vault_env.lifecycle",
            stage = "lifecycle.phase",
            from = old_phase.as_str(),
            to = new_phase.as_str()
        );
        self.emit(StateEvent::PhaseChanged {
            old_phase,
            new_phase,
            timestamp: Utc::now(),
        });

        Ok(old_phase)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
