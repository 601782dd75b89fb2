//! Flag endpoint
//!
//! - `/` (any method) - evaluated flags as indented JSON
//!
//! Other paths fall through to the router's default 404.

use crate::flags::{build_snapshot, to_json_pretty, FlagProvider};
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Content type sent with flag snapshots
pub const JSON_CONTENT_TYPE: &str = "Application/JSON";

/// Shared state for the flag endpoint
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn FlagProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn FlagProvider>) -> Self {
        Self { provider }
    }
}

/// Flag snapshot handler
///
/// Evaluates the published flags on every request; nothing is cached.
async fn flags(State(state): State<AppState>) -> Response {
    let snapshot = build_snapshot(state.provider.as_ref());
    json_response(&snapshot)
}

/// 200 with the indented JSON body, or a bare 500 if serialization fails
pub fn json_response<T: Serialize + ?Sized>(value: &T) -> Response {
    match to_json_pretty(value) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            internal_error()
        }
    }
}

/// 500 carrying only the standard reason phrase
fn internal_error() -> Response {
    let code = StatusCode::INTERNAL_SERVER_ERROR;
    let message = code.canonical_reason().unwrap_or("Internal Server Error");
    (
        code,
        [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        format!("{}\n", message),
    )
        .into_response()
}

/// Build the router for the flag endpoint
pub fn router(provider: Arc<dyn FlagProvider>) -> Router {
    Router::new()
        .route("/", any(flags))
        .with_state(AppState::new(provider))
}
