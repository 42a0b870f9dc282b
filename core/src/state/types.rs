//! Lifecycle state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Environment lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvPhase {
    Idle,
    Initializing,
    Ready,
    Unloading,
    Reloading,
}

impl EnvPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Unloading => "unloading",
            Self::Reloading => "reloading",
        }
    }
}

/// Phase of the collection pair, guarded against re-entrant initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityPhase {
    Idle,
    Initializing,
    Ready,
}

/// Lifecycle events broadcast to subscribers.
#[derive(Debug, Clone, Serialize)]
pub enum StateEvent {
    PhaseChanged {
        old_phase: EnvPhase,
        new_phase: EnvPhase,
        timestamp: DateTime<Utc>,
    },
    EntitiesLoaded {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
    EntitiesUnloaded {
        timestamp: DateTime<Utc>,
    },
    ImportStarted {
        strategy: String,
        timestamp: DateTime<Utc>,
    },
    ImportFinished {
        strategy: String,
        outcome: String,
        timestamp: DateTime<Utc>,
    },
    ChatReady {
        sessions: usize,
        timestamp: DateTime<Utc>,
    },
}

impl StateEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PhaseChanged { timestamp, .. } => *timestamp,
            Self::EntitiesLoaded { timestamp, .. } => *timestamp,
            Self::EntitiesUnloaded { timestamp } => *timestamp,
            Self::ImportStarted { timestamp, .. } => *timestamp,
            Self::ImportFinished { timestamp, .. } => *timestamp,
            Self::ChatReady { timestamp, .. } => *timestamp,
        }
    }
}
