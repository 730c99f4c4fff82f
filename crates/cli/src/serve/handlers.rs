//! HTTP route handlers: dispatch over GET and POST, health, fallbacks.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ownership_core::request::{self, Params};
use ownership_core::{Envelope, Rendered, SERVICE_VERSION};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// Fallback for methods other than GET and POST on `/`.
pub(crate) async fn handle_method_not_allowed() -> impl IntoResponse {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.dispatcher.config();
    let response = serde_json::json!({
        "status": "ok",
        "version": SERVICE_VERSION,
        "backend": state.dispatcher.backend_id(),
        "project": config.project,
        "dataset": config.dataset,
    });
    (StatusCode::OK, Json(response))
}

/// GET /?mode=...
pub(crate) async fn handle_query(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    match query_params(query) {
        Ok(params) => dispatch(&state, &params).await,
        Err(response) => response,
    }
}

/// POST / with a JSON body such as `{"mode": "trend"}`, or an empty body
/// and `?mode=` in the query string.
pub(crate) async fn handle_dispatch(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let query = match query_params(query) {
        Ok(params) => params,
        Err(response) => return response,
    };

    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            return json_error(rejection.status(), &rejection.body_text()).into_response();
        }
    };

    let params = match request::post_params(&body, query) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "rejected request body");
            return envelope_response(&Envelope::rejected(&e.to_string()));
        }
    };
    dispatch(&state, &params).await
}

fn query_params(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Params, Response> {
    match query {
        Ok(Query(pairs)) => Ok(request::params_from_query(pairs)),
        Err(rejection) => {
            let message = format!("Invalid query string: {}", rejection.body_text());
            Err(envelope_response(&Envelope::rejected(&message)))
        }
    }
}

async fn dispatch(state: &AppState, params: &Params) -> Response {
    let mode = request::requested_mode(params);
    let envelope = state.dispatcher.handle(mode.as_deref()).await;
    envelope_response(&envelope)
}

fn envelope_response(envelope: &Envelope) -> Response {
    let Rendered { status_code, body } = envelope.render();
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
