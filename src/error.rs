//! Common error types for training-sync

use thiserror::Error;

/// Common result type for training-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for one reconciliation run
///
/// Failures are contained at the smallest scope that can absorb them:
/// per-attempt inside `Authenticator::login`, per-task inside the
/// dispatcher pool. Only `Auth` exhaustion aborts a run.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// All login attempts exhausted, or the portal rejected the credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The portal no longer honors the cached session cookie
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Browser automation failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Captcha recognition failure
    #[error("Captcha error: {0}")]
    Captcha(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
