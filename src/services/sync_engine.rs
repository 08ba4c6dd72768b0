//! Per-task reconciliation contract
//!
//! A remote-call failure of any kind clears the stored session so the
//! next run re-authenticates; a database failure does not, since it is
//! a storage fault rather than an auth fault. Both fail only the task
//! at hand.

use crate::db;
use crate::error::{Error, Result};
use crate::models::{ReconciliationTask, SyncOutcome};
use crate::services::portal_client::PortalClient;
use crate::services::session_store::SessionStore;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Applies one task's remote snapshot to storage
pub struct SyncEngine {
    portal: PortalClient,
    pool: SqlitePool,
    session_store: SessionStore,
}

impl SyncEngine {
    pub fn new(portal: PortalClient, pool: SqlitePool, session_store: SessionStore) -> Self {
        Self {
            portal,
            pool,
            session_store,
        }
    }

    /// Sync one task with the given session credential.
    ///
    /// Idempotent: an unchanged remote total is a no-op, a changed one
    /// re-derives the whole detail window, so retrying after a failed
    /// attempt is always safe.
    pub async fn sync_one(
        &self,
        task: &ReconciliationTask,
        credential: &str,
    ) -> Result<SyncOutcome> {
        let snapshot = match self.portal.fetch_completions(task, credential).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Cannot tell an expired session apart from a transport
                // blip here; both clear the cookie so the next run
                // re-authenticates.
                warn!(license = %task.license_no, error = %e, "Remote call failed; clearing session");
                self.session_store.clear();
                return Err(Error::SessionInvalid(format!(
                    "{}: {}",
                    task.license_no, e
                )));
            }
        };

        if snapshot.total == task.last_known_total {
            info!(
                license = %task.license_no,
                total = snapshot.total,
                "Totals unchanged; skipping"
            );
            return Ok(SyncOutcome::Unchanged);
        }

        // Storage faults propagate as Database errors and leave the
        // session untouched.
        let rows = db::training::apply_snapshot(&self.pool, task, &snapshot).await?;

        Ok(SyncOutcome::Updated { rows })
    }
}
