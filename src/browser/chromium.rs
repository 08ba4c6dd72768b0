//! Headless Chromium adapter over the CDP
//!
//! Launches one browser process for the lifetime of the driver; pages
//! are created per login attempt and discarded with it. Every CDP call
//! is bounded by the config request timeout so a wedged renderer cannot
//! hang the run.

use super::{BrowserError, BrowserDriver, BrowserPage};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;

const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Production browser driver backed by a headless Chromium process
pub struct ChromiumDriver {
    browser: Browser,
}

impl ChromiumDriver {
    /// Launch a headless browser and start draining its CDP event stream
    pub async fn launch() -> Result<Self, BrowserError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(CDP_REQUEST_TIMEOUT)
            .build()
            .map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler stream must be polled for the connection to make
        // progress; it ends when the browser process exits.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser })
    }

    /// Close the browser process and reap it
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "Browser process wait failed");
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        Ok(Box::new(ChromiumPage { page }))
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn find(&self, selector: &str) -> Result<Element, BrowserError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))
    }
}

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(timeout))?
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(protocol)?;
        element.type_str(text).await.map_err(protocol)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.find(selector).await?.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>, BrowserError> {
        self.find(selector)
            .await?
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(protocol)
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::Timeout(timeout))?
            .map_err(protocol)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        self.page
            .url()
            .await
            .map_err(protocol)?
            .ok_or_else(|| BrowserError::Protocol("page reports no URL".to_string()))
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        match self.page.find_element(selector).await {
            Ok(element) => element.inner_text().await.map_err(protocol),
            Err(_) => Ok(None),
        }
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError> {
        let cookies = self.page.get_cookies().await.map_err(protocol)?;
        Ok(cookies.into_iter().map(|c| (c.name, c.value)).collect())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page.clone().close().await.map_err(protocol)
    }
}
