//! Transactional application of a remote snapshot
//!
//! Delete-then-reinsert makes the detail window fully replacing, so a
//! retried task re-derives the same rows instead of accumulating
//! duplicates.

use crate::error::Result;
use crate::models::{ReconciliationTask, RemoteSnapshot};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

/// Replace the task's detail window and refresh its summary row in a
/// single transaction. Partial application is never observable: either
/// all three statements commit or none do.
///
/// Returns the number of detail rows inserted.
pub async fn apply_snapshot(
    pool: &SqlitePool,
    task: &ReconciliationTask,
    snapshot: &RemoteSnapshot,
) -> Result<usize> {
    let window_start = task.window_start.format("%Y-%m-%d").to_string();
    let window_end = task.window_end.format("%Y-%m-%d").to_string();

    let mut tx = pool.begin().await?;

    // Comparing on date(completed_at) keeps completions late on the final
    // day inside the window, so the delete always covers what the API
    // call fetched.
    sqlx::query(
        r#"
        DELETE FROM external_training_detail
        WHERE license_no = ?
          AND date(completed_at) >= ?
          AND date(completed_at) <= ?
        "#,
    )
    .bind(&task.license_no)
    .bind(&window_start)
    .bind(&window_end)
    .execute(&mut *tx)
    .await?;

    for row in &snapshot.rows {
        sqlx::query(
            r#"
            INSERT INTO external_training_detail (
                class_ym, license_no, emp_id, course, completed_at
            ) VALUES (
                ?, ?,
                (SELECT emp_id FROM sales_agents WHERE license_no = ?),
                ?, ?
            )
            "#,
        )
        .bind(&task.class_ym)
        .bind(&task.license_no)
        .bind(&task.license_no)
        .bind(&row.fullname)
        .bind(row.finish_time.to_storage())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        UPDATE external_training_summary
        SET total_complete = ?, refreshed_at = ?
        WHERE license_no = ? AND window_start = ? AND window_end = ?
        "#,
    )
    .bind(snapshot.total)
    .bind(Utc::now().to_rfc3339())
    .bind(&task.license_no)
    .bind(&window_start)
    .bind(&window_end)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        license = %task.license_no,
        class_ym = %task.class_ym,
        rows = snapshot.rows.len(),
        total = snapshot.total,
        "Replaced detail window and refreshed summary"
    );

    Ok(snapshot.rows.len())
}
