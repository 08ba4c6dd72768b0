//! Portal completion-detail API client
//!
//! POSTs the form the portal's company dashboard uses, authenticated by
//! the serialized session cookie. Any response that fails to decode as
//! a snapshot is reported as `InvalidResponse` — typically the portal
//! serving its login page instead of JSON once a session expires.

use crate::models::{ReconciliationTask, RemoteSnapshot};
use std::time::Duration;
use thiserror::Error;

const API_PATH: &str = "/moodle/company/ajax_list.php?api=complete_status_company_detail";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Portal API client errors
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Completion-detail API client
pub struct PortalClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PortalError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the completion snapshot for one task's license and window
    pub async fn fetch_completions(
        &self,
        task: &ReconciliationTask,
        credential: &str,
    ) -> Result<RemoteSnapshot, PortalError> {
        let (start_epoch, end_epoch) = task.window_epochs();
        let params = [
            ("salesregid", task.license_no.as_str()),
            ("finish_start_date", &start_epoch.to_string()),
            ("finish_end_date", &end_epoch.to_string()),
        ];

        let url = format!("{}{}", self.base_url, API_PATH);
        tracing::debug!(license = %task.license_no, url = %url, "Querying completion API");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::COOKIE, credential)
            .form(&params)
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PortalError::Http(status.as_u16(), error_text));
        }

        // Decode via text so a login-page body surfaces as InvalidResponse
        // rather than a transport error.
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        let snapshot: RemoteSnapshot = serde_json::from_str(&body)
            .map_err(|e| PortalError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            license = %task.license_no,
            total = snapshot.total,
            rows = snapshot.rows.len(),
            "Completion snapshot received"
        );

        Ok(snapshot)
    }
}
