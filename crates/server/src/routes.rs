//! HTTP routes.

use crate::middleware::{self, RequestId};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures::FutureExt;
use rulegate_ask::{Orchestrator, RateLimiter};
use rulegate_core::domain::{AskRequest, ErrorResponse};
use rulegate_core::AppError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Shared, read-only state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub limiter: Arc<RateLimiter>,
    pub allow_origin: Arc<str>,
    pub request_timeout: Duration,
}

/// Build the service router with its middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/ask", post(ask))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::access_log))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cors,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .with_state(state)
}

/// JSON error body with the status for the error's category.
pub fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            return error_response(&AppError::Validation("invalid JSON body".to_string()));
        }
    };

    let pipeline = AssertUnwindSafe(state.orchestrator.ask(request)).catch_unwind();

    match tokio::time::timeout(state.request_timeout, pipeline).await {
        Ok(Ok(Ok(outcome))) => Json(outcome.response).into_response(),
        Ok(Ok(Err(err))) => error_response(&err),
        Ok(Err(panic)) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::error!(
                request_id = %request_id,
                panic = %message,
                "Panic recovered"
            );
            error_response(&AppError::Internal("panic in request handler".to_string()))
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = state.request_timeout.as_secs_f64(),
                "Request deadline exceeded"
            );
            error_response(&AppError::backend("deadline", "request deadline exceeded"))
        }
    }
}
