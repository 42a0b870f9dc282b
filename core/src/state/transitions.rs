//! Environment phase transition rules.

use super::types::EnvPhase;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: EnvPhase, to: EnvPhase },
}

pub struct StateTransition;

impl StateTransition {
    /// Validate a phase change.
    ///
    /// `unload()` while `Initializing` is rejected: suspended waits are aborted
    /// through cancellation first, which drops the phase back to `Idle`.
    pub fn validate(from: EnvPhase, to: EnvPhase) -> Result<(), TransitionError> {
        let is_valid = matches!(
            (from, to),
            (EnvPhase::Idle, EnvPhase::Initializing)
                | (EnvPhase::Initializing, EnvPhase::Ready)
                | (EnvPhase::Initializing, EnvPhase::Idle)
                | (EnvPhase::Ready, EnvPhase::Unloading)
                | (EnvPhase::Idle, EnvPhase::Unloading)
                | (EnvPhase::Unloading, EnvPhase::Idle)
                | (EnvPhase::Ready, EnvPhase::Reloading)
                | (EnvPhase::Idle, EnvPhase::Reloading)
                | (EnvPhase::Reloading, EnvPhase::Initializing)
                | (EnvPhase::Reloading, EnvPhase::Idle)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    /// Phases in which a wait may be suspended.
    pub fn is_busy(phase: EnvPhase) -> bool {
        matches!(
            phase,
            EnvPhase::Initializing | EnvPhase::Unloading | EnvPhase::Reloading
        )
    }
}
