//! Resend cooldown timer.
//!
//! A countdown that gates only the resend affordance, never the verify
//! submit. Each session owns one; the ticking task is aborted when the
//! session is torn down so no tick ever leaks across flow instances.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use vouch_common::constants::COOLDOWN_TICK_SECS;

/// Session-owned countdown over an atomic seconds counter.
///
/// `start` is restartable: every successful (re)dispatch resets the counter
/// to the full constant and replaces the ticking task. The countdown is not
/// cumulative across starts.
#[derive(Debug)]
pub struct Cooldown {
    remaining: Arc<AtomicU32>,
    tick: Duration,
    task: Option<JoinHandle<()>>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::with_tick(Duration::from_secs(COOLDOWN_TICK_SECS))
    }

    /// Custom tick interval, used by tests to compress time
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            remaining: Arc::new(AtomicU32::new(0)),
            tick,
            task: None,
        }
    }

    /// (Re)start the countdown at `secs`, replacing any running tick task
    pub fn start(&mut self, secs: u32) {
        self.stop();
        self.remaining.store(secs, Ordering::SeqCst);

        let remaining = Arc::clone(&self.remaining);
        let tick = self.tick;
        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                let left = decrement(&remaining);
                if left == 0 {
                    break;
                }
            }
        }));
    }

    /// Stop ticking and zero the counter (used by "go back" and teardown)
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.remaining.store(0, Ordering::SeqCst);
    }

    /// Seconds until resend is permitted
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// True exactly when the counter has reached 0
    pub fn is_ready(&self) -> bool {
        self.remaining() == 0
    }
}

/// Saturating one-second step down; never goes below 0
fn decrement(remaining: &AtomicU32) -> u32 {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            Some(v.saturating_sub(1))
        })
        .map(|prev| prev.saturating_sub(1))
        .unwrap_or(0)
}

impl Drop for Cooldown {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new()
    }
}
