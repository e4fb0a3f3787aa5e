//! Fixed-interval polling of workflow execution status.
//!
//! The poller fetches once immediately, hands every snapshot to the caller,
//! and keeps fetching while any execution is still running. It is a plain
//! loop: no backoff, no retries. A failed fetch ends the watch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use db::models::WorkflowExecutionRow;

use crate::models::WatchTarget;
use crate::EngineError;

/// Anything that can report the current executions for a watch target.
#[async_trait]
pub trait ExecutionStatusSource: Send + Sync {
    async fn fetch(&self, target: &WatchTarget) -> Result<Vec<WorkflowExecutionRow>, EngineError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between fetches while something is still running.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// True once no execution in the snapshot is `RUNNING`. An empty snapshot is
/// settled.
pub fn all_terminal(executions: &[WorkflowExecutionRow]) -> bool {
    executions.iter().all(|e| e.status.is_terminal())
}

// ---------------------------------------------------------------------------
// ExecutionPoller
// ---------------------------------------------------------------------------

pub struct ExecutionPoller {
    source: Arc<dyn ExecutionStatusSource>,
    config: PollConfig,
}

impl ExecutionPoller {
    pub fn new(source: Arc<dyn ExecutionStatusSource>, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Poll until every execution of `target` is terminal and return the
    /// final snapshot. `on_update` sees every snapshot, the final one
    /// included.
    #[instrument(skip(self, on_update), fields(
        database_id = %target.database_id,
        asset_id = %target.asset_id,
    ))]
    pub async fn watch<F>(
        &self,
        target: &WatchTarget,
        mut on_update: F,
    ) -> Result<Vec<WorkflowExecutionRow>, EngineError>
    where
        F: FnMut(&[WorkflowExecutionRow]) + Send,
    {
        let mut timer = interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;

        loop {
            // The first tick completes immediately.
            timer.tick().await;
            polls += 1;

            let snapshot = self.source.fetch(target).await?;
            on_update(&snapshot);

            if all_terminal(&snapshot) {
                info!("all {} executions settled after {polls} polls", snapshot.len());
                return Ok(snapshot);
            }

            let running = snapshot.iter().filter(|e| !e.status.is_terminal()).count();
            debug!("{running} executions still running");
        }
    }
}
