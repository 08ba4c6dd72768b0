//! Value types shared across the sync pipeline

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde::Deserialize;

/// The portal reports completion times in its local timezone (UTC+8).
/// Epoch window bounds must be derived against that offset or the API
/// returns records shifted by a day at the window edges.
pub const PORTAL_UTC_OFFSET_SECS: i64 = 8 * 3600;

const SECS_PER_DAY: i64 = 86_400;

/// One agent/date-window pair whose cached completion total may be stale.
///
/// Read from the summary table at the start of a run; immutable for the
/// duration of one sync attempt and owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct ReconciliationTask {
    /// Sales license number; partition key for both the remote API and
    /// the local detail/summary predicates
    pub license_no: String,
    /// Roster employee identifier backing the summary row
    pub emp_id: String,
    /// Portal registration number; tasks without one are never selected
    pub reg_number: String,
    /// Year-month audit tag for the training window
    pub class_ym: String,
    /// First day of the training window (inclusive)
    pub window_start: NaiveDate,
    /// Last day of the training window (inclusive)
    pub window_end: NaiveDate,
    /// Completion count observed on the last successful sync
    pub last_known_total: i64,
}

impl ReconciliationTask {
    /// Epoch-second bounds of the window in portal local time:
    /// 00:00:00 of `window_start` through 23:59:59 of `window_end`.
    pub fn window_epochs(&self) -> (i64, i64) {
        let start = self.window_start.and_time(NaiveTime::MIN).and_utc().timestamp()
            - PORTAL_UTC_OFFSET_SECS;
        let end = self.window_end.and_time(NaiveTime::MIN).and_utc().timestamp()
            + SECS_PER_DAY
            - 1
            - PORTAL_UTC_OFFSET_SECS;
        (start, end)
    }
}

/// Completion data returned by the portal for one task
///
/// `rows` is only authoritative when `total` differs from the task's
/// `last_known_total`; an unchanged total short-circuits before any write.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSnapshot {
    pub total: i64,
    pub rows: Vec<CompletionRow>,
}

/// One completion event from the portal
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRow {
    /// Course/completion subject name as displayed by the portal
    pub fullname: String,
    pub finish_time: FinishTime,
}

/// The portal serves `finish_time` either as a formatted string or as
/// raw epoch seconds depending on the course type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FinishTime {
    Epoch(i64),
    Text(String),
}

impl FinishTime {
    /// Normalize to a `YYYY-MM-DD HH:MM:SS` wall-clock string in portal
    /// local time for storage in the detail table.
    pub fn to_storage(&self) -> String {
        match self {
            FinishTime::Text(s) => s.trim().to_string(),
            FinishTime::Epoch(secs) => match chrono::DateTime::from_timestamp(*secs, 0) {
                Some(dt) => (dt.naive_utc() + TimeDelta::seconds(PORTAL_UTC_OFFSET_SECS))
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                None => secs.to_string(),
            },
        }
    }
}

/// Per-task result of a successful sync; failures are the `Err` arm of
/// `SyncEngine::sync_one`. Unchanged and Updated both count as success
/// in the run tally but are logged distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote total matched the cached total; nothing was written
    Unchanged,
    /// Detail rows replaced and summary refreshed
    Updated { rows: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start: NaiveDate, end: NaiveDate) -> ReconciliationTask {
        ReconciliationTask {
            license_no: "A123".to_string(),
            emp_id: "E001".to_string(),
            reg_number: "R001".to_string(),
            class_ym: "202401".to_string(),
            window_start: start,
            window_end: end,
            last_known_total: 0,
        }
    }

    #[test]
    fn window_epochs_cover_full_days_in_portal_time() {
        let t = task(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let (start, end) = t.window_epochs();
        // 2024-01-01T00:00:00+08:00
        assert_eq!(start, 1_704_038_400);
        // 2024-01-31T23:59:59+08:00
        assert_eq!(end, 1_706_716_799);
    }

    #[test]
    fn window_epochs_single_day_window() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (start, end) = task(day, day).window_epochs();
        assert_eq!(end - start, 86_399);
    }

    #[test]
    fn snapshot_accepts_string_finish_time() {
        let snapshot: RemoteSnapshot = serde_json::from_str(
            r#"{"total": 2, "rows": [
                {"fullname": "Ethics 101", "finish_time": "2024-01-05 10:30:00"},
                {"fullname": "Product Rules", "finish_time": "2024-01-06 09:00:00"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].finish_time.to_storage(), "2024-01-05 10:30:00");
    }

    #[test]
    fn snapshot_accepts_epoch_finish_time() {
        let snapshot: RemoteSnapshot = serde_json::from_str(
            r#"{"total": 1, "rows": [{"fullname": "AML Refresher", "finish_time": 1704442200}]}"#,
        )
        .unwrap();
        // 1704442200 = 2024-01-05T08:10:00Z = 16:10:00 at UTC+8
        assert_eq!(snapshot.rows[0].finish_time.to_storage(), "2024-01-05 16:10:00");
    }

    #[test]
    fn snapshot_rejects_missing_fields() {
        assert!(serde_json::from_str::<RemoteSnapshot>(r#"{"total": 3}"#).is_err());
        assert!(serde_json::from_str::<RemoteSnapshot>(r#"{"rows": []}"#).is_err());
        // A login page instead of JSON must not parse either
        assert!(serde_json::from_str::<RemoteSnapshot>("<html><body>login</body></html>").is_err());
    }
}
