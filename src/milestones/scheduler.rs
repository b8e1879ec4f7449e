//! Periodic sweep scheduler and the immediate-publication hook
//!
//! One scheduler per process, shared by `Arc`. `start()` registers a single
//! fixed-interval timer task; every tick runs one sweep behind a reentrancy
//! guard. A failing or panicking sweep is logged and the timer keeps going.
//!
//! The guard belongs to the task running the sweep, not to the caller
//! awaiting it: a sweep cut loose by `stop()` keeps the guard until it
//! finishes. The timer task only holds a `Weak` reference, so dropping the
//! last `Arc` ends the timer.

use super::engine::{MilestonePipeline, SweepReport};
use super::types::{Announcement, IncomingAction};
use crate::error::{FeedError, Result};
use rusqlite::Transaction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep was still in progress
    Skipped,
    Failed(String),
}

pub struct AggregationScheduler {
    pipeline: Arc<MilestonePipeline>,
    period: Duration,
    sweep_in_progress: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the in-progress flag on every exit path, unwinding included.
struct SweepGuard(Arc<AtomicBool>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AggregationScheduler {
    pub fn new(pipeline: Arc<MilestonePipeline>, period: Duration) -> Self {
        Self {
            pipeline,
            period,
            sweep_in_progress: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.timer.lock() {
            Ok(timer) if timer.as_ref().is_some_and(|handle| !handle.is_finished()) => {
                SchedulerState::Running
            }
            _ => SchedulerState::Stopped,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Register the periodic sweep. The first sweep runs right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut timer = self.timer.lock().map_err(|_| FeedError::LockPoisoned)?;
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(FeedError::AlreadyRunning);
        }

        log::info!(
            "⏰ Starting milestone sweeps (interval: {}s, action type: {})",
            self.period.as_secs(),
            self.pipeline.action_type_code()
        );

        let scheduler: Weak<Self> = Arc::downgrade(self);
        let period = self.period;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(scheduler) = scheduler.upgrade() else {
                    log::debug!("Scheduler dropped, timer exiting");
                    break;
                };
                scheduler.run_sweep().await;
            }
        }));

        Ok(())
    }

    /// Cancel the timer. Stopping a stopped scheduler is a no-op.
    pub fn stop(&self) {
        let handle = match self.timer.lock() {
            Ok(mut timer) => timer.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            handle.abort();
            log::info!("⏹️  Milestone sweeps stopped");
        }
    }

    /// Run one sweep unless another one is still in progress.
    ///
    /// Never returns an error: failures and panics are logged and reported
    /// as [`SweepOutcome::Failed`].
    pub async fn run_sweep(&self) -> SweepOutcome {
        if self
            .sweep_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("⏭️  Previous sweep still running, skipping this tick");
            return SweepOutcome::Skipped;
        }
        let guard = SweepGuard(Arc::clone(&self.sweep_in_progress));

        // Own task so a panic inside the sweep surfaces as a JoinError. The
        // guard moves with it and outlives this future if it gets dropped.
        let pipeline = Arc::clone(&self.pipeline);
        let result = tokio::spawn(async move {
            let _guard = guard;
            pipeline.sweep().await
        })
        .await;

        match result {
            Ok(Ok(report)) => {
                match report.to_json_line() {
                    Ok(json) => log::info!("✅ Sweep complete: {}", json),
                    Err(_) => log::info!("✅ Sweep complete: {:?}", report),
                }
                SweepOutcome::Completed(report)
            }
            Ok(Err(e)) => {
                log::error!("❌ Sweep failed: {}", e);
                SweepOutcome::Failed(e.to_string())
            }
            Err(join_error) => {
                log::error!("❌ Sweep aborted: {}", join_error);
                SweepOutcome::Failed(join_error.to_string())
            }
        }
    }

    /// Immediate hook for the ingestion path.
    ///
    /// Posts IMAGE and TEXT actions to the feed inside the caller's
    /// transaction. Errors propagate to the caller.
    pub fn handle_action(
        &self,
        action: &IncomingAction,
        tx: &Transaction<'_>,
    ) -> Result<Option<Announcement>> {
        self.pipeline.publisher().publish_immediate(action, tx)
    }
}

impl Drop for AggregationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
