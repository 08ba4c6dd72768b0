//! Outstanding-task queries
//!
//! A task is a summary row whose cached completion total no longer
//! matches the expected total, restricted to agents still on the active
//! roster. Storage errors here degrade to "nothing to do this run".

use crate::error::{Error, Result};
use crate::models::ReconciliationTask;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use tracing::error;

/// Fetch all summary rows awaiting reconciliation.
///
/// Never fails the caller: any storage error is logged and an empty
/// list returned, so a broken database simply means an idle run.
pub async fn fetch_outstanding(pool: &SqlitePool) -> Vec<ReconciliationTask> {
    match query_outstanding(pool).await {
        Ok(tasks) => tasks,
        Err(e) => {
            error!(error = %e, "Failed to fetch outstanding tasks");
            Vec::new()
        }
    }
}

async fn query_outstanding(pool: &SqlitePool) -> Result<Vec<ReconciliationTask>> {
    let rows = sqlx::query(
        r#"
        SELECT s.license_no, s.emp_id, s.reg_number, s.class_ym,
               s.window_start, s.window_end, s.total_complete
        FROM external_training_summary s
        JOIN sales_agents r
          ON r.emp_id = s.emp_id
         AND r.working_status = 'W'
        WHERE s.reg_number IS NOT NULL
          AND s.total_complete <> s.expected_total
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ReconciliationTask {
                license_no: row.try_get("license_no")?,
                emp_id: row.try_get("emp_id")?,
                reg_number: row.try_get("reg_number")?,
                class_ym: row.try_get("class_ym")?,
                window_start: parse_date(row.try_get("window_start")?)?,
                window_end: parse_date(row.try_get("window_end")?)?,
                last_known_total: row.try_get("total_complete")?,
            })
        })
        .collect()
}

fn parse_date(value: String) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Invalid window date {:?}: {}", value, e)))
}
