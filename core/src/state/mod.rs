//! # Lifecycle state
//!
//! Environment phase (`StateManager`), its transition rules, and the
//! re-entrancy guard around collection initialization (`EntityLifecycle`).

pub mod entities;
pub mod manager;
pub mod transitions;
pub mod types;

pub use entities::{Completion, EntityLifecycle};
pub use manager::StateManager;
pub use transitions::{StateTransition, TransitionError};
pub use types::{EntityPhase, EnvPhase, StateEvent};
