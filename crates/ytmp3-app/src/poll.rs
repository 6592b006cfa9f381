//! Task polling: re-fetch the task list while any task is pending.
//!
//! [`TaskPoller`] is the state machine (`Idle` / `Awaiting`); every
//! transition takes the current instant so it can be driven with synthetic
//! time. [`TaskWatcher`] runs it against a [`CachedFetch`] on the tokio timer.
//!
//! At most one timer is armed at any time: every observation cancels the
//! armed timer before deciding whether to arm a new one.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use ytmp3_core::{has_pending, PollConfig, Task};

use crate::fetch::{CachedFetch, FetchState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No pending task observed; no timer armed
    Idle,
    /// A re-fetch is scheduled for `deadline`
    Awaiting { deadline: Instant },
}

/// Delay before the next poll after `failures` consecutive failed fetches.
///
/// Exponential with cap, so a server outage does not turn into a tight loop.
pub fn backoff_delay(config: &PollConfig, failures: u32) -> Duration {
    if failures == 0 {
        return config.interval;
    }
    let factor = 2_u32.saturating_pow(failures);
    config
        .interval
        .saturating_mul(factor)
        .min(config.max_backoff)
}

#[derive(Debug, Clone)]
pub struct TaskPoller {
    config: PollConfig,
    state: PollState,
    failures: u32,
    had_pending: bool,
}

impl TaskPoller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            state: PollState::Idle,
            failures: 0,
            had_pending: false,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PollState::Awaiting { deadline } => Some(deadline),
            PollState::Idle => None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Re-evaluate from the latest fetch result.
    ///
    /// Cancels any armed timer, then arms one when a task is pending. A failed
    /// fetch keeps polling (with backoff) only if tasks were pending before it.
    pub fn observe(&mut self, latest: &FetchState<Vec<Task>>, now: Instant) -> PollState {
        self.cancel();

        match (&latest.data, &latest.error) {
            (Some(tasks), _) => {
                self.failures = 0;
                self.had_pending = has_pending(tasks);
                if self.had_pending {
                    self.arm(now + self.config.interval);
                }
            }
            (None, Some(err)) if self.had_pending => {
                self.failures = self.failures.saturating_add(1);
                let delay = backoff_delay(&self.config, self.failures);
                tracing::warn!(
                    error = %err,
                    failures = self.failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "Task list fetch failed while tasks are pending"
                );
                self.arm(now + delay);
            }
            (None, _) => {
                self.had_pending = false;
            }
        }

        self.state
    }

    /// Returns true (and goes `Idle`) when the armed timer is due at `now`.
    /// The caller must then re-fetch and [`observe`](Self::observe) the result.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            PollState::Awaiting { deadline } if now >= deadline => {
                self.state = PollState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drop the armed timer (unmount).
    pub fn cancel(&mut self) {
        self.state = PollState::Idle;
    }

    fn arm(&mut self, deadline: Instant) {
        tracing::debug!(in_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64, "Task poll scheduled");
        self.state = PollState::Awaiting { deadline };
    }
}

/// Background driver of a [`TaskPoller`] for one task list.
///
/// Shutdown: [`TaskWatcher::shutdown`] cancels the armed timer and stops the
/// loop; a request already in flight is not aborted.
pub struct TaskWatcher {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl TaskWatcher {
    pub fn spawn(tasks: CachedFetch<Vec<Task>>, config: PollConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(Self::run(tasks, TaskPoller::new(config), shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Task watcher ended abnormally");
        }
    }

    async fn run(
        tasks: CachedFetch<Vec<Task>>,
        mut poller: TaskPoller,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut updates = tasks.subscribe();
        {
            let current = updates.borrow_and_update().clone();
            if !current.is_loading {
                poller.observe(&current, Instant::now());
            }
        }
        tracing::debug!(key = %tasks.key(), "Task watcher started");

        loop {
            let deadline = poller.deadline();
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    poller.cancel();
                    break;
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = updates.borrow_and_update().clone();
                    // The result of the in-flight request will arrive as its own update.
                    if !latest.is_loading {
                        poller.observe(&latest, Instant::now());
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if poller.fire(Instant::now()) {
                        tasks.refetch().await;
                    }
                }
            }
        }

        tracing::debug!("Task watcher stopped");
    }
}
