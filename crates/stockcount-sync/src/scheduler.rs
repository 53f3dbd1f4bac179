//! # Sync Scheduler
//!
//! Background task deciding when the engine runs a cycle.
//!
//! ## Triggers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SyncScheduler::run (tokio task)                    │
//! │                                                                         │
//! │  tokio::select! {                                                       │
//! │    sync tick      (interval_secs, default 1 h) ──► run_cycle            │
//! │    retry timer    (after a failed cycle)       ──► run_cycle            │
//! │    connectivity   (watch<bool>, offline→online)──► run_cycle            │
//! │    SyncNow        (handle)                     ──► run_cycle            │
//! │                   (dropped if sent while a cycle runs)                  │
//! │    refresh tick   (pending_refresh_secs, 5 s)  ──► refresh_status       │
//! │    Refresh        (handle.nudge after writes)  ──► refresh_status       │
//! │    shutdown                                    ──► break                │
//! │  }                                                                      │
//! │                                                                         │
//! │  RETRY BACKOFF (after a cycle with errors)                              │
//! │  ─────────────────────────────────────────                              │
//! │  1st failure: ~retry_initial_backoff_secs (5 s)                         │
//! │  then doubling, capped at interval_secs                                 │
//! │  a clean cycle resets it                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SyncSettings;
use crate::engine::{CycleOutcome, SyncEngine};
use crate::error::{SyncError, SyncResult};

/// Requests accepted by the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    SyncNow,
    RefreshPending,
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for controlling the scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<Command>,
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Asks for a cycle now.
    ///
    /// Requests arriving while a cycle runs are dropped, not queued.
    ///
    /// ## Errors
    /// `SyncError::ShuttingDown` once the scheduler task has stopped.
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.command_tx
            .send(Command::SyncNow)
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Asks for a pending-count refresh without waiting.
    ///
    /// Coalesces with requests already queued.
    pub fn nudge(&self) {
        if let Err(mpsc::error::TrySendError::Closed(_)) = self.command_tx.try_send(Command::RefreshPending) {
            debug!("Scheduler stopped, nudge ignored");
        }
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }
}

// =============================================================================
// Scheduler
// =============================================================================

pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    settings: SyncSettings,
    connectivity: watch::Receiver<bool>,
    command_rx: mpsc::Receiver<Command>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SyncScheduler {
    /// Creates a scheduler and returns a handle.
    ///
    /// `connectivity` carries the platform's online flag.
    pub fn new(
        engine: Arc<SyncEngine>,
        settings: SyncSettings,
        connectivity: watch::Receiver<bool>,
    ) -> (Self, SchedulerHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = SyncScheduler {
            engine,
            settings,
            connectivity,
            command_rx,
            shutdown_rx,
        };

        (scheduler, SchedulerHandle { command_tx, shutdown_tx })
    }

    fn new_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.settings.retry_initial_backoff(),
            max_interval: self.settings.interval(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs the scheduler loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(
            enabled = self.settings.enabled,
            interval_secs = self.settings.interval_secs,
            "Sync scheduler starting"
        );

        let mut backoff = self.new_backoff();
        let mut retry_at: Option<Instant> = None;

        let mut sync_interval = tokio::time::interval(self.settings.interval());
        sync_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut refresh_interval = tokio::time::interval(self.settings.pending_refresh());
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let initially_online = *self.connectivity.borrow_and_update();
        self.engine.set_online(initially_online);
        let mut connectivity_open = true;

        loop {
            let retry = retry_at;

            let run_cycle = tokio::select! {
                // Periodic sync (the first tick fires immediately)
                _ = sync_interval.tick() => true,

                // Retry after a failed cycle
                _ = sleep_until_opt(retry) => {
                    debug!("Retrying sync after backoff");
                    retry_at = None;
                    true
                }

                // Connectivity changes
                changed = self.connectivity.changed(), if connectivity_open => {
                    if changed.is_err() {
                        warn!("Connectivity source dropped, keeping last known state");
                        connectivity_open = false;
                        false
                    } else {
                        let online = *self.connectivity.borrow_and_update();
                        self.engine.set_online(online)
                    }
                }

                // Pending badge refresh
                _ = refresh_interval.tick() => {
                    self.refresh().await;
                    false
                }

                // Handle requests
                Some(command) = self.command_rx.recv() => {
                    match command {
                        Command::SyncNow => true,
                        Command::RefreshPending => {
                            self.refresh().await;
                            false
                        }
                    }
                }

                // Shutdown
                _ = self.shutdown_rx.recv() => {
                    info!("Sync scheduler shutting down");
                    break;
                }
            };

            if run_cycle {
                self.cycle(&mut backoff, &mut retry_at).await;
                sync_interval.reset();
                self.discard_requests_queued_during_cycle();
            }
        }

        info!("Sync scheduler stopped");
    }

    async fn cycle(&self, backoff: &mut ExponentialBackoff, retry_at: &mut Option<Instant>) {
        if !self.settings.enabled {
            debug!("Sync disabled, skipping cycle");
            return;
        }

        match self.engine.run_cycle().await {
            CycleOutcome::Skipped(reason) => {
                debug!(?reason, "Sync cycle skipped");
            }
            outcome if outcome.is_failure() => {
                let delay = backoff
                    .next_backoff()
                    .unwrap_or_else(|| self.settings.interval());
                warn!(retry_in_secs = delay.as_secs(), "Sync cycle failed, scheduling retry");
                *retry_at = Some(Instant::now() + delay);
            }
            CycleOutcome::Completed(_) => {
                backoff.reset();
                *retry_at = None;
            }
        }
    }

    /// Drops requests that arrived while a cycle ran.
    ///
    /// The cycle just refreshed the pending count, so queued refreshes go too.
    fn discard_requests_queued_during_cycle(&mut self) {
        let mut dropped = 0usize;
        while let Ok(command) = self.command_rx.try_recv() {
            if command == Command::SyncNow {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "Sync requests received mid-cycle dropped");
        }
    }

    async fn refresh(&self) {
        if let Err(e) = self.engine.refresh_status().await {
            error!(error = %e, "Failed to refresh pending count");
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
