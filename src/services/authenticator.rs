//! Portal login with captcha retry
//!
//! Each attempt drives a fresh page through the login form, reads the
//! captcha through the injected recognizer, and classifies the result:
//! the URL leaving the login page is success, a visible error banner is
//! a rejected attempt, anything else before the settle timeout is
//! inconclusive. Only success short-circuits; every other outcome
//! consumes one attempt and backs off briefly.

use crate::browser::{BrowserDriver, BrowserError, BrowserPage};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::captcha::CaptchaRecognizer;
use crate::services::jitter;
use crate::services::session_store::SessionStore;
use std::time::Duration;
use tracing::{info, warn};

const LOGIN_PATH: &str = "/edu/mpage/";
/// Substring of the login page URL; once it no longer appears the
/// portal has navigated into the authenticated area.
const LOGIN_PAGE_MARKER: &str = "mpage";

const USERNAME_SELECTOR: &str = "#username";
const PASSWORD_SELECTOR: &str = "#password";
const CAPTCHA_IMG_SELECTOR: &str = "#captcha_img";
const CAPTCHA_CODE_SELECTOR: &str = "#captcha_code";
const SIGNIN_BUTTON_SELECTOR: &str = ".btn-signin";
const ERROR_ALERT_SELECTOR: &str = ".alert.alert-danger";

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives the portal login flow and persists the session cookie
pub struct Authenticator<'a, D, R> {
    driver: &'a D,
    recognizer: &'a R,
    session_store: &'a SessionStore,
    config: &'a Config,
}

impl<'a, D, R> Authenticator<'a, D, R>
where
    D: BrowserDriver,
    R: CaptchaRecognizer,
{
    pub fn new(
        driver: &'a D,
        recognizer: &'a R,
        session_store: &'a SessionStore,
        config: &'a Config,
    ) -> Self {
        Self {
            driver,
            recognizer,
            session_store,
            config,
        }
    }

    /// Attempt login up to `max_attempts` times. On success the cookie
    /// string is already persisted through the session store; exhausting
    /// the attempts is terminal for the whole run.
    pub async fn login(&self, max_attempts: u32) -> Result<()> {
        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "Attempting portal login");

            match self.attempt_login().await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Login attempt errored"),
            }

            if attempt < max_attempts {
                tokio::time::sleep(jitter(self.config.login_backoff_ms)).await;
            }
        }

        Err(Error::Auth(format!(
            "all {} login attempts failed",
            max_attempts
        )))
    }

    /// One attempt on a fresh page; the page is always discarded so a
    /// bad attempt cannot leave state behind for the next one.
    async fn attempt_login(&self) -> Result<bool> {
        let page = self
            .driver
            .new_page()
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        let outcome = self.drive_login_form(page.as_ref()).await;

        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "Failed to close login page");
        }

        outcome
    }

    async fn drive_login_form(&self, page: &dyn BrowserPage) -> Result<bool> {
        let login_url = format!("{}{}", self.config.base_url, LOGIN_PATH);
        page.goto(&login_url, NAVIGATION_TIMEOUT)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        page.fill(USERNAME_SELECTOR, &self.config.username)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;
        page.fill(PASSWORD_SELECTOR, &self.config.password)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        let image = page
            .screenshot_element(CAPTCHA_IMG_SELECTOR)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;
        let captcha_text = self
            .recognizer
            .recognize(&image)
            .await
            .map_err(|e| Error::Captcha(e.to_string()))?;
        info!(captcha = %captcha_text, "Captcha recognized");

        page.fill(CAPTCHA_CODE_SELECTOR, &captcha_text)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;
        page.click(SIGNIN_BUTTON_SELECTOR)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        // Neither a URL change nor a banner within the settle window:
        // captcha misread or slow network, either way inconclusive.
        match page.wait_for_idle(SETTLE_TIMEOUT).await {
            Ok(()) => {}
            Err(BrowserError::Timeout(_)) => {
                warn!("Post-submit wait timed out; attempt inconclusive");
                return Ok(false);
            }
            Err(e) => return Err(Error::Browser(e.to_string())),
        }

        let url = page
            .current_url()
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        if !url.contains(LOGIN_PAGE_MARKER) {
            let cookies = page
                .cookies()
                .await
                .map_err(|e| Error::Browser(e.to_string()))?;
            let credential = cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            self.session_store.save(&credential);
            info!("Login succeeded; URL left the login page");
            return Ok(true);
        }

        if let Some(text) = page
            .element_text(ERROR_ALERT_SELECTOR)
            .await
            .map_err(|e| Error::Browser(e.to_string()))?
        {
            warn!(message = %text.trim(), "Portal rejected login");
        }

        Ok(false)
    }
}
