//! Cancellable fixed-interval background work.
//!
//! Ticks are dropped, not queued: when the action outruns the
//! interval, the missed ticks are discarded and the schedule resumes
//! on the next boundary. Within one task the action never overlaps
//! itself.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Handle to a running periodic task.
///
/// `stop` is the only clean way to end the schedule; once stopped, the
/// task is terminal and a new one must be spawned to resume. Dropping
/// an unstopped handle aborts the background task, so the schedule is
/// released on every exit path.
pub struct PeriodicTask {
    shutdown: Arc<Notify>,
    ticks: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a background task that runs `action` once per `interval`
    /// until stopped. The first tick fires one full interval after
    /// spawn.
    pub fn spawn<F, Fut>(interval: Duration, action: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(Error::Config("periodic interval must be non-zero".into()));
        }

        let shutdown = Arc::new(Notify::new());
        let ticks = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_schedule(
            interval,
            action,
            Arc::clone(&shutdown),
            Arc::clone(&ticks),
        ));

        Ok(Self {
            shutdown,
            ticks,
            worker: Some(worker),
        })
    }

    /// Number of ticks whose action has run to completion.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Stop the schedule and wait until it has observably ceased.
    ///
    /// When this returns, no further tick will fire: an in-flight tick
    /// is allowed to finish and is waited for. Calling `stop` again is
    /// a no-op.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shutdown.notify_one();
        if let Err(e) = worker.await {
            // the schedule contains tick faults itself; reaching here
            // means the loop task was aborted externally
            warn!(error = %e, "periodic task ended abnormally");
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn run_schedule<F, Fut>(
    period: Duration,
    action: F,
    shutdown: Arc<Notify>,
    ticks: Arc<AtomicU64>,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // First fire at now + period; Skip drops ticks missed while the
    // action was still running instead of queueing a burst.
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.notified() => {
                debug!(ticks = ticks.load(Ordering::Acquire), "periodic task stopping");
                return;
            }
            _ = interval.tick() => {
                // The action runs on its own task so a panic is caught
                // at this tick's boundary and the schedule continues.
                match tokio::spawn(action()).await {
                    Ok(()) => {
                        ticks.fetch_add(1, Ordering::Release);
                    }
                    Err(e) if e.is_panic() => {
                        warn!(error = %e, "tick action panicked");
                    }
                    Err(_) => {}
                }
            }
        }
    }
}
