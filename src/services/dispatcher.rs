//! Bounded worker pool over the outstanding-task list
//!
//! Tasks run with bounded parallelism; each worker pauses a small
//! random delay after finishing a task to rate-limit the portal. One
//! task's failure is logged and tallied without disturbing the rest of
//! the pool, and the pool always drains fully before reporting.

use crate::models::{ReconciliationTask, SyncOutcome};
use crate::services::jitter;
use crate::services::sync_engine::SyncEngine;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs the sync engine over all outstanding tasks
pub struct Dispatcher {
    engine: Arc<SyncEngine>,
    max_workers: usize,
    task_delay_ms: (u64, u64),
}

impl Dispatcher {
    pub fn new(engine: Arc<SyncEngine>, max_workers: usize, task_delay_ms: (u64, u64)) -> Self {
        Self {
            engine,
            max_workers: max_workers.max(1),
            task_delay_ms,
        }
    }

    /// Process every task and return `(success_count, total)`.
    ///
    /// The credential is captured immutably per worker; invalidation
    /// happens through the session-store side channel only, so an
    /// in-flight sibling is never aborted by another task's failure.
    pub async fn run(&self, tasks: Vec<ReconciliationTask>, credential: &str) -> (usize, usize) {
        let total = tasks.len();
        let succeeded = Arc::new(AtomicUsize::new(0));

        stream::iter(tasks)
            .map(|task| {
                let engine = Arc::clone(&self.engine);
                let succeeded = Arc::clone(&succeeded);
                let credential = credential.to_string();
                let delay_range = self.task_delay_ms;

                async move {
                    match engine.sync_one(&task, &credential).await {
                        Ok(SyncOutcome::Unchanged) => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                            debug!(license = %task.license_no, "Task complete (no change)");
                        }
                        Ok(SyncOutcome::Updated { rows }) => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                            info!(license = %task.license_no, rows, "Task complete (updated)");
                        }
                        Err(e) => {
                            // Isolated: counted, logged, siblings unaffected
                            error!(license = %task.license_no, error = %e, "Task failed");
                        }
                    }

                    tokio::time::sleep(jitter(delay_range)).await;
                }
            })
            .buffer_unordered(self.max_workers)
            .collect::<Vec<()>>()
            .await;

        (succeeded.load(Ordering::Relaxed), total)
    }
}
