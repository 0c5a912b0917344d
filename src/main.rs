//! Entry point: assembles configuration, store, LLM client and scheduler,
//! then serves the HTTP surface until an interrupt triggers graceful
//! shutdown. Grounded on the teacher's `main.rs` startup sequence (configure
//! logging, load config, connect db, spawn workers, serve) generalized from
//! the teacher's single long-running worker loop into the scheduler's two
//! cron-driven jobs plus an HTTP server.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use newsloom::config::Config;
use newsloom::llm::LlmClient;
use newsloom::scheduler::Scheduler;
use newsloom::store::Store;
use newsloom::web::{self, AppState};
use newsloom::{logging, TARGET_SCHED};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::configure_logging();

    let config = Config::from_env()?;
    info!("newsloom starting up");

    let store = Store::connect(&config.database_path).await?;
    seed_feeds(&store, &config).await;

    let llm = LlmClient::ollama(&config.llm.base_url);
    let http = reqwest::Client::new();

    let scheduler = Scheduler::new(store.clone(), llm.clone(), http.clone(), config.clone());
    let job_handles = scheduler.spawn();

    let state = AppState {
        store,
        llm,
        http,
        scheduler: scheduler.clone(),
        config: config.clone(),
    };

    let shutdown_token = CancellationToken::new();
    let server_shutdown = shutdown_token.clone();
    let server = tokio::spawn(web::serve(state, config.http_port, async move {
        server_shutdown.cancelled().await;
    }));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install ctrl_c handler: {}", e);
    }
    info!("shutdown signal received");

    scheduler.cancel();
    shutdown_token.cancel();

    for handle in job_handles {
        if let Err(e) = handle.await {
            error!(target: TARGET_SCHED, error = %e, "scheduler task join failed");
        }
    }
    if let Err(e) = server.await {
        error!("HTTP server task join failed: {}", e);
    }

    info!("newsloom shut down cleanly");
    Ok(())
}

/// Seeds `FEED_URLS` into the store on startup; `upsert_feed` is idempotent
/// on url, so this is safe to run on every boot.
async fn seed_feeds(store: &Store, config: &Config) {
    for url in &config.feed_urls {
        if let Err(e) = store.upsert_feed(url, 0).await {
            error!(url = %url, error = %e, "failed to seed feed");
        }
    }
}
