//! HTTP middleware, outermost first: request id, CORS, access log, rate limit.

use crate::routes::{error_response, AppState};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rulegate_ask::client_identity;
use rulegate_core::AppError;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of the current request, available as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// `<unix-millis>-<counter>`, unique within the process.
fn next_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}", millis, counter)
}

/// Assign a request id, open the request span and echo the id in `X-Request-ID`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = next_request_id();
    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Add CORS headers; answer preflight requests with 204.
pub async fn cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(&state.allow_origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// One log line per request with method, path, status and duration.
pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Request"
    );
    response
}

/// Reject requests from clients that have used up their tokens.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let identity = {
        let forwarded_for = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok());
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();
        client_identity(forwarded_for, &remote_addr)
    };

    if !state.limiter.allow(&identity) {
        tracing::warn!(client = %identity, "Rate limit exceeded");
        return error_response(&AppError::RateLimited);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let first = next_request_id();
        let second = next_request_id();
        assert_ne!(first, second);

        let (millis, counter) = first.split_once('-').unwrap();
        assert!(millis.parse::<u128>().unwrap() > 0);
        assert!(counter.parse::<u64>().unwrap() > 0);
    }
}
