//! Operational components of the sync pipeline

pub mod authenticator;
pub mod captcha;
pub mod dispatcher;
pub mod portal_client;
pub mod session_store;
pub mod sync_engine;

pub use authenticator::Authenticator;
pub use captcha::{CaptchaRecognizer, OcrHttpRecognizer};
pub use dispatcher::Dispatcher;
pub use portal_client::PortalClient;
pub use session_store::SessionStore;
pub use sync_engine::SyncEngine;

use rand::Rng;
use std::time::Duration;

/// Random delay drawn from an inclusive millisecond range; both retry
/// backoff and inter-task pacing use it to avoid hammering the portal
/// in lockstep.
pub(crate) fn jitter((min_ms, max_ms): (u64, u64)) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}
