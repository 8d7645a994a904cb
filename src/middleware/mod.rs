//! Tower middleware layers.
//!
//! [`health_probe`] answers `GET /health` locally, but only when the
//! request does not carry the target header: any request that names an
//! upstream is relayed, whatever its path.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::health;
use crate::server::AppState;

pub const HEALTH_PATH: &str = "/health";

pub async fn health_probe(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let is_probe = request.method() == Method::GET
        && request.uri().path() == HEALTH_PATH
        && !request
            .headers()
            .contains_key(&state.relay.rules.target_header);

    if is_probe {
        return Json(health::snapshot(&state)).into_response();
    }
    next.run(request).await
}
