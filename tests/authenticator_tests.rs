//! Authenticator scenario tests with fake browser and recognizer
//!
//! A correct recognizer against a cooperative portal succeeds on the
//! first attempt; a misreading recognizer exhausts the attempt cap with
//! no session file written; a post-submit timeout consumes an attempt.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use training_sync::browser::{BrowserDriver, BrowserError, BrowserPage};
use training_sync::config::Config;
use training_sync::services::captcha::{CaptchaError, CaptchaRecognizer};
use training_sync::services::{Authenticator, SessionStore};
use training_sync::Error;

const CORRECT_CAPTCHA: &str = "7B3K";
const LOGIN_URL: &str = "https://portal.example/edu/mpage/";
const HOME_URL: &str = "https://portal.example/edu/home";

/// What the fake portal does after the sign-in click
#[derive(Clone, Copy, PartialEq)]
enum Portal {
    /// Accept the correct captcha, show a banner otherwise
    Normal,
    /// Never navigate nor show a banner before the settle timeout
    Unresponsive,
}

struct FakePage {
    portal: Portal,
    captcha_entered: std::sync::Mutex<String>,
    submitted: std::sync::Mutex<bool>,
}

impl FakePage {
    fn accepted(&self) -> bool {
        *self.submitted.lock().unwrap()
            && *self.captcha_entered.lock().unwrap() == CORRECT_CAPTCHA
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, _url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        if selector == "#captcha_code" {
            *self.captcha_entered.lock().unwrap() = text.to_string();
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        if selector == ".btn-signin" {
            *self.submitted.lock().unwrap() = true;
        }
        Ok(())
    }

    async fn screenshot_element(&self, _selector: &str) -> Result<Vec<u8>, BrowserError> {
        Ok(b"\x89PNG fake captcha".to_vec())
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        match self.portal {
            Portal::Unresponsive => Err(BrowserError::Timeout(timeout)),
            Portal::Normal => Ok(()),
        }
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        if self.accepted() {
            Ok(HOME_URL.to_string())
        } else {
            Ok(LOGIN_URL.to_string())
        }
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        if selector == ".alert.alert-danger" && *self.submitted.lock().unwrap() && !self.accepted()
        {
            Ok(Some("Incorrect verification code".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError> {
        Ok(vec![
            ("MoodleSession".to_string(), "deadbeef".to_string()),
            ("lang".to_string(), "en".to_string()),
        ])
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

struct FakeDriver {
    portal: Portal,
    pages_opened: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            portal: self.portal,
            captcha_entered: std::sync::Mutex::new(String::new()),
            submitted: std::sync::Mutex::new(false),
        }))
    }
}

struct FixedRecognizer(&'static str);

#[async_trait]
impl CaptchaRecognizer for FixedRecognizer {
    async fn recognize(&self, _image: &[u8]) -> Result<String, CaptchaError> {
        Ok(self.0.to_string())
    }
}

struct FailingRecognizer;

#[async_trait]
impl CaptchaRecognizer for FailingRecognizer {
    async fn recognize(&self, _image: &[u8]) -> Result<String, CaptchaError> {
        Err(CaptchaError::Empty)
    }
}

fn test_config(cookie_file: &Path) -> Config {
    Config {
        username: "agent007".to_string(),
        password: "secret".to_string(),
        base_url: "https://portal.example".to_string(),
        database_url: "sqlite::memory:".to_string(),
        ocr_endpoint: "http://127.0.0.1:1/ocr".to_string(),
        cookie_file: cookie_file.to_path_buf(),
        max_workers: 1,
        request_timeout: Duration::from_secs(5),
        login_max_attempts: 3,
        task_delay_ms: (0, 0),
        login_backoff_ms: (0, 0),
    }
}

fn driver(portal: Portal) -> (FakeDriver, Arc<AtomicUsize>) {
    let pages = Arc::new(AtomicUsize::new(0));
    (
        FakeDriver {
            portal,
            pages_opened: Arc::clone(&pages),
        },
        pages,
    )
}

#[tokio::test]
async fn correct_captcha_succeeds_on_first_attempt() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cookies.txt"));
    let store = SessionStore::new(config.cookie_file.clone());
    let (driver, pages) = driver(Portal::Normal);
    let recognizer = FixedRecognizer(CORRECT_CAPTCHA);

    let authenticator = Authenticator::new(&driver, &recognizer, &store, &config);
    authenticator.login(5).await.unwrap();

    assert_eq!(pages.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.load(),
        Some("MoodleSession=deadbeef; lang=en".to_string())
    );
}

#[tokio::test]
async fn misread_captcha_exhausts_attempts_with_no_session_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cookies.txt"));
    let store = SessionStore::new(config.cookie_file.clone());
    let (driver, pages) = driver(Portal::Normal);
    let recognizer = FixedRecognizer("WRONG");

    let authenticator = Authenticator::new(&driver, &recognizer, &store, &config);
    let err = authenticator.login(4).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    // One fresh page per attempt, every attempt consumed
    assert_eq!(pages.load(Ordering::SeqCst), 4);
    assert_eq!(store.load(), None);
}

#[tokio::test]
async fn unresponsive_portal_counts_as_failed_attempts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cookies.txt"));
    let store = SessionStore::new(config.cookie_file.clone());
    let (driver, pages) = driver(Portal::Unresponsive);
    let recognizer = FixedRecognizer(CORRECT_CAPTCHA);

    let authenticator = Authenticator::new(&driver, &recognizer, &store, &config);
    let err = authenticator.login(2).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(pages.load(Ordering::SeqCst), 2);
    assert_eq!(store.load(), None);
}

#[tokio::test]
async fn recognizer_failure_consumes_attempts_without_crashing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cookies.txt"));
    let store = SessionStore::new(config.cookie_file.clone());
    let (driver, pages) = driver(Portal::Normal);

    let authenticator = Authenticator::new(&driver, &FailingRecognizer, &store, &config);
    let err = authenticator.login(2).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(pages.load(Ordering::SeqCst), 2);
    assert_eq!(store.load(), None);
}
