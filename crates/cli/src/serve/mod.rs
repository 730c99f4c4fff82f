//! `ownership serve` -- the HTTP function.
//!
//! Runs the mode dispatcher behind an `axum` + `tokio` server, suitable for
//! Cloud Run or any container platform that sets `PORT`.
//!
//! Endpoints:
//! - GET  /         - Run the mode named by `?mode=` (default `latest`)
//! - POST /         - Run the mode named by the JSON body's `mode` field
//! - GET  /health   - Server status (exempt from auth)
//!
//! Optional API key authentication via the OWNERSHIP_API_KEY env var.
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use ownership_core::Dispatcher;
use tower_http::trace::TraceLayer;

use self::handlers::{
    handle_dispatch, handle_health, handle_method_not_allowed, handle_not_found, handle_query,
};
use self::middleware::auth_middleware;
use self::state::AppState;

/// Maximum request body size: 64 KB. Bodies only ever carry a mode name.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Env var holding the API key. Unset or empty disables auth.
const API_KEY_ENV: &str = "OWNERSHIP_API_KEY";

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"ok": false, "error": message})))
}

/// Build the router over shared state.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(handle_query)
                .post(handle_dispatch)
                .fallback(handle_method_not_allowed),
        )
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port and serve until SIGINT/SIGTERM.
pub async fn start_server(
    port: u16,
    dispatcher: Dispatcher,
) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }

    let backend = dispatcher.backend_id().to_string();
    let state = Arc::new(AppState {
        dispatcher,
        api_key,
    });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %backend, "ownership service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for Ctrl+C or, on unix, SIGTERM (sent by container platforms).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("received shutdown signal");
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
