//! Re-entrancy guard for collection initialization.

use std::sync::{Mutex, MutexGuard};

use super::types::EntityPhase;

/// How an in-flight initialization ended relative to the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Still the current generation; the result may be installed.
    Current,
    /// Unloaded while in flight; the result must be discarded.
    Stale,
}

#[derive(Debug)]
struct Inner {
    generation: u64,
    /// Generation of the initialization holding the guard, if any.
    owner: Option<u64>,
    loaded: bool,
}

/// Three-state machine `Idle -> Initializing -> Ready` with a generation counter.
///
/// A second `try_begin` while a call is in flight is dropped, not queued.
/// `invalidate` bumps the generation so the in-flight call finds itself stale
/// when it resumes.
#[derive(Debug)]
pub struct EntityLifecycle {
    inner: Mutex<Inner>,
}

impl EntityLifecycle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                owner: None,
                loaded: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> EntityPhase {
        let inner = self.lock();
        if inner.owner.is_some() {
            EntityPhase::Initializing
        } else if inner.loaded {
            EntityPhase::Ready
        } else {
            EntityPhase::Idle
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Acquire the guard. `None` if an initialization is already in flight.
    pub fn try_begin(&self) -> Option<u64> {
        let mut inner = self.lock();
        if inner.owner.is_some() {
            return None;
        }
        inner.generation += 1;
        inner.owner = Some(inner.generation);
        Some(inner.generation)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Release the guard after a successful load.
    pub fn complete(&self, generation: u64) -> Completion {
        let mut inner = self.lock();
        if inner.owner == Some(generation) {
            inner.owner = None;
        }
        if inner.generation == generation {
            inner.loaded = true;
            Completion::Current
        } else {
            Completion::Stale
        }
    }

    /// Release the guard after a failed load.
    pub fn fail(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.owner == Some(generation) {
            inner.owner = None;
        }
    }

    /// Mark unloaded and supersede any in-flight initialization.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.loaded = false;
    }

    /// Clear a guard left held by a superseded initialization. Returns true if one was held.
    pub fn force_release(&self) -> bool {
        self.lock().owner.take().is_some()
    }
}

impl Default for EntityLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_dropped() {
        let lc = EntityLifecycle::new();
        let gen = lc.try_begin().unwrap();
        assert_eq!(lc.phase(), EntityPhase::Initializing);
        assert!(lc.try_begin().is_none());

        assert_eq!(lc.complete(gen), Completion::Current);
        assert_eq!(lc.phase(), EntityPhase::Ready);
        assert!(lc.is_loaded());
    }

    #[test]
    fn test_invalidate_makes_in_flight_stale() {
        let lc = EntityLifecycle::new();
        let gen = lc.try_begin().unwrap();
        lc.invalidate();
        assert!(!lc.is_current(gen));

        assert_eq!(lc.complete(gen), Completion::Stale);
        assert!(!lc.is_loaded());
        assert_eq!(lc.phase(), EntityPhase::Idle);
    }

    #[test]
    fn test_force_release_lets_new_initialization_win() {
        let lc = EntityLifecycle::new();
        let old = lc.try_begin().unwrap();
        lc.invalidate();
        assert!(lc.force_release());

        let new = lc.try_begin().unwrap();
        assert_eq!(lc.complete(old), Completion::Stale);
        // The stale completion must not release the new owner.
        assert_eq!(lc.phase(), EntityPhase::Initializing);
        assert_eq!(lc.complete(new), Completion::Current);
        assert_eq!(lc.phase(), EntityPhase::Ready);
    }

    #[test]
    fn test_fail_returns_to_idle() {
        let lc = EntityLifecycle::new();
        let gen = lc.try_begin().unwrap();
        lc.fail(gen);
        assert_eq!(lc.phase(), EntityPhase::Idle);
        assert!(lc.try_begin().is_some());
    }
}
