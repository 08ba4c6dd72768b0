//! training-sync - external training completion reconciliation
//!
//! Batch job: one login-if-needed cycle followed by one reconciliation
//! pass over all stale summary rows, then exit. Session acquisition is
//! a prerequisite and runs single-threaded before the worker pool.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use training_sync::browser::ChromiumDriver;
use training_sync::config::Config;
use training_sync::db;
use training_sync::services::{
    Authenticator, Dispatcher, OcrHttpRecognizer, PortalClient, SessionStore, SyncEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting training-sync");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().context("configuration")?;

    let pool = db::init_database_pool(&config.database_url)
        .await
        .context("database")?;
    info!("Database connection established");

    let session_store = SessionStore::new(config.cookie_file.clone());

    // Login only when there is no cached session; an invalid cached
    // session surfaces during the pass and clears itself for next run.
    let credential = match session_store.load() {
        Some(credential) => credential,
        None => {
            info!("No cached session; running portal login");
            login(&config, &session_store).await?;
            session_store
                .load()
                .ok_or_else(|| anyhow!("login reported success but no session cookie was stored"))?
        }
    };

    let tasks = db::tasks::fetch_outstanding(&pool).await;
    if tasks.is_empty() {
        info!("No outstanding reconciliation tasks");
        return Ok(());
    }
    info!(count = tasks.len(), "Processing outstanding tasks");

    let portal = PortalClient::new(&config.base_url, config.request_timeout)
        .map_err(|e| anyhow!("portal client: {}", e))?;
    let engine = SyncEngine::new(portal, pool.clone(), session_store.clone());
    let dispatcher = Dispatcher::new(Arc::new(engine), config.max_workers, config.task_delay_ms);

    let (succeeded, total) = dispatcher.run(tasks, &credential).await;
    info!(succeeded, total, "Reconciliation pass complete");

    Ok(())
}

/// One browser lifetime per login call; every attempt inside gets its
/// own page.
async fn login(config: &Config, session_store: &SessionStore) -> Result<()> {
    let driver = ChromiumDriver::launch()
        .await
        .map_err(|e| anyhow!("browser launch: {}", e))?;
    let recognizer = OcrHttpRecognizer::new(&config.ocr_endpoint, config.request_timeout)
        .map_err(|e| anyhow!("ocr client: {}", e))?;

    let authenticator = Authenticator::new(&driver, &recognizer, session_store, config);
    let outcome = authenticator.login(config.login_max_attempts).await;

    driver.shutdown().await;

    outcome.context("login")
}
