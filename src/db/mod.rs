//! Database access for training-sync
//!
//! Summary/detail tables for external training completions plus the
//! active sales-agent roster used to resolve employee identifiers.

pub mod tasks;
pub mod training;

use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

/// Bound on waiting for a pool connection; a wedged database must not
/// hang the run indefinitely.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

/// Initialize database connection pool
pub async fn init_database_pool(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the training tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Summary: one row per license/date-window, carrying the cached and
    // expected completion totals the reconciliation pass compares.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS external_training_summary (
            class_ym TEXT NOT NULL,
            license_no TEXT NOT NULL,
            emp_id TEXT NOT NULL,
            reg_number TEXT,
            window_start TEXT NOT NULL,
            window_end TEXT NOT NULL,
            total_complete INTEGER NOT NULL DEFAULT 0,
            expected_total INTEGER NOT NULL DEFAULT 0,
            refreshed_at TEXT,
            PRIMARY KEY (license_no, window_start, window_end)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Detail: one row per completion event
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS external_training_detail (
            class_ym TEXT NOT NULL,
            license_no TEXT NOT NULL,
            emp_id TEXT,
            course TEXT NOT NULL,
            completed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Active-roster lookup keyed on employee id; licenses resolve to
    // employee ids through it at insert time.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sales_agents (
            emp_id TEXT PRIMARY KEY,
            license_no TEXT,
            working_status TEXT NOT NULL DEFAULT 'W'
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database tables initialized (summary, detail, roster)");

    Ok(())
}
