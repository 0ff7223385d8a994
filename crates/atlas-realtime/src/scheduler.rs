//! # Interval Scheduler
//!
//! Self-rearming timer driving periodic work (the warranty expiry scan).
//!
//! ## Fail-Open Re-Arming
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scheduler Loop                                     │
//! │                                                                         │
//! │  arm(name, interval, handler)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──► sleep(interval)      (or shutdown signal → exit)                 │
//! │  │        │                                                             │
//! │  │        ▼                                                             │
//! │  │   spawn handler.on_tick() in its OWN task                           │
//! │  │        │                                                             │
//! │  │        ▼                                                             │
//! │  │   await the JoinHandle                                              │
//! │  │        │                                                             │
//! │  │        ├── Ok(Ok)     → logged at debug                             │
//! │  │        ├── Ok(Err)    → logged, loop continues                      │
//! │  │        └── Err(panic) → logged, loop continues  ← the spawn         │
//! │  │        │                 catches the panic                          │
//! │  └────────┘                                                             │
//! │                                                                         │
//! │  A slow tick delays the next arm until it returns: ticks never         │
//! │  overlap. A missed delivery waits at most one interval.                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::RealtimeResult;

/// Periodic work driven by the scheduler.
#[async_trait]
pub trait TickHandler: Send + Sync {
    /// Runs one tick. Errors are logged by the scheduler and never
    /// stop the loop.
    async fn on_tick(&self) -> RealtimeResult<()>;
}

/// Arms interval-driven tick loops.
pub struct Scheduler;

impl Scheduler {
    /// Arms a tick loop: sleep, tick, unconditionally re-arm.
    ///
    /// The tick runs in its own spawned task and the JoinHandle is
    /// awaited, so a panicking handler is caught and logged like any
    /// other failure.
    pub fn arm(
        name: &'static str,
        interval: Duration,
        handler: Arc<dyn TickHandler>,
    ) -> SchedulerHandle {
        info!(scheduler = name, ?interval, "Scheduler armed");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(interval) => {}
                    _ = shutdown_rx.changed() => {
                        info!(scheduler = name, "Scheduler stopped");
                        break;
                    }
                }

                let handler = Arc::clone(&handler);
                let tick = tokio::spawn(async move { handler.on_tick().await });

                match tick.await {
                    Ok(Ok(())) => debug!(scheduler = name, "Tick complete"),
                    Ok(Err(err)) => {
                        warn!(scheduler = name, error = %err, "Tick failed, re-arming")
                    }
                    Err(join_err) => {
                        error!(scheduler = name, error = %join_err, "Tick panicked, re-arming")
                    }
                }
            }
        });

        SchedulerHandle {
            name,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// The loop's name (diagnostics).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
