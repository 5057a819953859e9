//! Periodic anti-entropy scheduling.
//!
//! Every tick starts a fresh [`GossipNode::sync_round`] on its own task; the
//! timer never waits for earlier rounds, so one unresponsive neighbor cannot
//! stall the schedule. There is no retry bookkeeping: a delta that failed to
//! land stays unknown in the tracker and is simply sent again next tick.

use crate::config::AntiEntropyConfig;
use crate::error::GossipResult;
use crate::node::GossipNode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Fixed-period driver for sync rounds
pub struct SyncScheduler {
    node: Arc<GossipNode>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(node: Arc<GossipNode>, config: &AntiEntropyConfig) -> GossipResult<Self> {
        config.validate()?;
        Ok(Self {
            node,
            interval: config.sync_interval,
        })
    }

    /// Start ticking on the current runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing to sync at startup.
            ticker.tick().await;

            tracing::info!(
                node = %self.node.node_id(),
                interval_ms = self.interval.as_millis() as u64,
                "Sync scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let node = Arc::clone(&self.node);
                        tokio::spawn(async move {
                            node.sync_round().await;
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            tracing::info!(node = %self.node.node_id(), "Sync scheduler stopped");
        });

        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running [`SyncScheduler`].
///
/// Dropping the handle stops the scheduler as well.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the timer and wait for the scheduler task to exit.
    ///
    /// Rounds already in flight run to completion on their own tasks.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Sync scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
