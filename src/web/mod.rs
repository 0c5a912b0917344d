//! HTTP surface of the core (C1-C11 consumers, §6). Grounded on the
//! teacher's `app::api::app_api_loop`: a single `Router`, a `TcpListener`
//! bound up-front, `axum::serve` with connect-info. No auth layer -- the
//! teacher's JWT/device-id machinery belongs to the UI/front-end this core
//! explicitly excludes.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::scheduler::Scheduler;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub llm: LlmClient,
    pub http: reqwest::Client,
    pub scheduler: Arc<Scheduler>,
    pub config: Config,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/refresh", post(handlers::refresh))
        .route("/stories/generate", post(handlers::generate_stories))
        .route("/stories", get(handlers::list_stories))
        .route("/stories/{id}", get(handlers::get_story))
        .route("/stories/{id}/articles", get(handlers::get_story_articles))
        .route("/items", get(handlers::list_items))
        .route("/scheduler/status", get(handlers::scheduler_status))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/ollamaz", get(handlers::ollamaz))
        .with_state(state)
}

/// Binds and serves the router until `shutdown` resolves, mirroring the
/// teacher's bind-then-serve shape but with graceful shutdown wired to the
/// scheduler's cancellation token instead of running forever.
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}
