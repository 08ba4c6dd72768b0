//! Browser automation capability
//!
//! The authenticator drives the login page through these traits so it
//! can be exercised with fakes; `chromium` provides the production
//! adapter.

pub mod chromium;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Browser automation errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// One browsing context (page/tab). Each login attempt gets a fresh one
/// so a bad attempt cannot leak UI state into the next.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate, bounded by `timeout`
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Type `text` into the element at `selector`
    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Click the element at `selector`
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Screenshot a single element (PNG bytes)
    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>, BrowserError>;

    /// Wait for in-flight navigation/network to settle, bounded by
    /// `timeout`; a timeout is reported as `BrowserError::Timeout`
    async fn wait_for_idle(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Current page URL
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Inner text of the element at `selector`, `None` when absent
    async fn element_text(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// All cookies visible to this browsing context as (name, value)
    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError>;

    /// Close the page
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Factory for browsing contexts
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;
}
