//! Interval polling for views without an active stream.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

/// Cancellable, restartable, single-flight refresh loop.
///
/// `start` spawns a loop that waits one interval, then invokes the action
/// and awaits it before waiting again, so at most one invocation is ever in
/// flight. Action failures are logged and swallowed; the loop itself is the
/// retry mechanism, fixed interval, no backoff.
///
/// `stop` bumps a monotonic generation counter. Each loop iteration
/// re-checks its captured generation before invoking the action and again
/// before the next wait, so a timer that fires after `stop` performs
/// nothing. The counter only ever grows; a stale read can skip a late
/// action but never double-fire one.
pub struct PollScheduler {
    interval: Duration,
    generation: Arc<AtomicU64>,
    running: bool,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }

    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            generation: Arc::new(AtomicU64::new(0)),
            running: false,
            task: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin polling. A no-op when the scheduler is already running: one
    /// loop per scheduler, never two.
    pub fn start<A, Fut, E>(&mut self, mut action: A)
    where
        A: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display,
    {
        if self.running {
            return;
        }
        let generation = self.generation.clone();
        let current = generation.load(Ordering::SeqCst);
        let interval = self.interval;
        self.running = true;
        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if generation.load(Ordering::SeqCst) != current {
                    return;
                }
                if let Err(err) = action().await {
                    tracing::warn!(error = %err, "Poll refresh failed");
                }
                if generation.load(Ordering::SeqCst) != current {
                    return;
                }
            }
        }));
    }

    /// Stop polling. An already-dispatched action is allowed to finish, but
    /// the stale loop exits at its next generation check without invoking
    /// the action again.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.running = false;
        // Detach rather than abort: an in-flight refresh may finish, it
        // just cannot schedule further work under the old generation.
        self.task.take();
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
