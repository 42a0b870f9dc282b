//! Poll-until-ready waits with an injectable clock and cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

pub const SYNC_GATE_INTERVAL: Duration = Duration::from_millis(1_000);
pub const UI_CONTAINER_INTERVAL: Duration = Duration::from_millis(300);
pub const IMPORT_POLL_INTERVAL: Duration = Duration::from_millis(3_000);

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time, backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested sleep and yields instead of sleeping.
#[derive(Debug, Default, Clone)]
pub struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        tokio::task::yield_now().await;
    }
}

/// Poll interval plus an optional upper bound. `timeout: None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl WaitPolicy {
    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("{what} not ready after {waited:?}")]
    TimedOut { what: &'static str, waited: Duration },
    #[error("{what} wait cancelled")]
    Cancelled { what: &'static str },
}

/// Owner side of cancellation. Each `cancel()` aborts the waits holding a token
/// taken before it; tokens taken afterwards are unaffected.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<u64>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        let rx = self.tx.subscribe();
        let epoch = *rx.borrow();
        CancelToken { rx, epoch }
    }

    pub fn cancel(&self) {
        self.tx.send_modify(|epoch| *epoch += 1);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<u64>,
    epoch: u64,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.epoch
    }

    /// Resolves once cancelled. Never resolves if the source is dropped uncancelled.
    pub async fn cancelled(&mut self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            if self.rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

/// Evaluate `ready` until it returns true, sleeping `policy.interval` between checks.
///
/// Returns the number of evaluations. Elapsed time for the timeout is the sum of
/// the intervals slept, so an injected clock fully controls it.
pub async fn wait_until<F>(
    clock: &dyn Clock,
    policy: WaitPolicy,
    cancel: &mut CancelToken,
    what: &'static str,
    mut ready: F,
) -> Result<u32, WaitError>
where
    F: FnMut() -> bool + Send,
{
    let mut polls: u32 = 0;
    let mut waited = Duration::ZERO;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled { what });
        }
        polls += 1;
        if ready() {
            return Ok(polls);
        }
        if let Some(limit) = policy.timeout {
            if waited >= limit {
                return Err(WaitError::TimedOut { what, waited });
            }
        }

        tracing::debug!(
            target: "vault_env.wait",
            stage = "wait.poll",
            what = what,
            polls = polls
        );
        tokio::select! {
            _ = clock.sleep(policy.interval) => {}
            _ = cancel.cancelled() => return Err(WaitError::Cancelled { what }),
        }
        waited += policy.interval;
    }
}
