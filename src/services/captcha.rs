//! Captcha recognition capability
//!
//! Recognition is a replaceable dependency: the trait is what the
//! authenticator needs, the HTTP adapter is what production uses. The
//! sidecar takes raw PNG bytes and answers `{"text": "..."}`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "training-sync/0.1.0";

/// Captcha recognition errors
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("OCR service error {0}: {1}")]
    Service(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty recognition result")]
    Empty,
}

/// Black-box captcha image-to-text recognition
#[async_trait]
pub trait CaptchaRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError>;
}

/// OCR sidecar response shape
#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
}

/// Recognizer backed by an HTTP OCR sidecar service
pub struct OcrHttpRecognizer {
    http_client: reqwest::Client,
    endpoint: String,
}

impl OcrHttpRecognizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CaptchaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CaptchaError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CaptchaRecognizer for OcrHttpRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| CaptchaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CaptchaError::Service(status.as_u16(), error_text));
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::Parse(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(CaptchaError::Empty);
        }

        tracing::debug!(text = %text, "Captcha recognized");
        Ok(text)
    }
}
