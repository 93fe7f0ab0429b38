use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    middleware,
    routing::post,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth::require_secret;
use super::dispatcher::Dispatcher;
use super::response::Success;
use super::runner::{CommandRunner, ShellRunner};
use crate::config::Config;
use crate::errors::WebhookError;

pub const WEBHOOK_PATH: &str = "/webhook";

/// Shared application state. Read-only after startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        let dispatcher = Dispatcher::new(&config, runner);
        Self { config, dispatcher }
    }
}

/// Build the router: `POST /webhook`, guarded by the secret check.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(webhook_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn webhook_handler(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Success, WebhookError> {
    let body = body.map_err(|rejection| {
        warn!(error = %rejection, "Error reading body");
        WebhookError::BodyUnreadable(rejection.body_text())
    })?;
    state.dispatcher.dispatch(&body).await
}

/// Bind and serve until Ctrl+C.
pub async fn start_server(config: Arc<Config>) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone(), Arc::new(ShellRunner::new())));
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!("Server is running on {}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
