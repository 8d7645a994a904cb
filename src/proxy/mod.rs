//! Core HTTP relay handler.
//!
//! [`relay_handler`] is the Axum fallback that receives every request,
//! reads the upstream URL from the target header, forwards the request
//! with rewritten headers, and relays the upstream response back.
//! Submodules handle header construction ([`headers`]), the status
//! override table ([`policy`]), and the outbound call ([`upstream`]).

pub mod headers;
pub mod policy;
pub mod upstream;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::task::AbortHandle;

use crate::config::model::RelayOptions;
use crate::error::RelayError;
use crate::server::AppState;
use headers::HeaderRules;
use upstream::{OutboundRequest, UpstreamError};

/// Per-request failures, each rendered as a plain-text response.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No {header} specified in headers")]
    MissingTarget { header: HeaderName },

    #[error("Invalid {header} specified in headers")]
    InvalidTarget { header: HeaderName },

    #[error("{header} is not an absolute http(s) URL: {reason}")]
    UnparseableTarget { header: HeaderName, reason: String },

    #[error("{message}")]
    Upstream { message: String },
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingTarget { .. }
            | Self::InvalidTarget { .. }
            | Self::UnparseableTarget { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Relay behavior derived from [`RelayOptions`] once at startup.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub rules: HeaderRules,
    pub timeout: Option<Duration>,
    pub cancel_on_disconnect: bool,
}

impl RelaySettings {
    pub fn from_options(options: &RelayOptions) -> Result<Self, RelayError> {
        let target_header = options
            .target_header
            .parse::<HeaderName>()
            .map_err(|_| RelayError::TargetHeader {
                name: options.target_header.clone(),
            })?;
        Ok(Self {
            rules: HeaderRules {
                target_header,
                forward_user_agent: options.forward_user_agent,
            },
            timeout: options.timeout.map(Duration::from_millis),
            cancel_on_disconnect: options.cancel_on_disconnect,
        })
    }
}

/// Read the upstream URL from the target header. It must appear exactly
/// once, be textual, and parse as an absolute http(s) URL with a host.
pub fn extract_target(headers: &HeaderMap, name: &HeaderName) -> Result<url::Url, ProxyError> {
    let mut values = headers.get_all(name).iter();
    let (Some(value), None) = (values.next(), values.next()) else {
        return Err(if headers.contains_key(name) {
            ProxyError::InvalidTarget {
                header: name.clone(),
            }
        } else {
            ProxyError::MissingTarget {
                header: name.clone(),
            }
        });
    };
    let raw = value.to_str().map_err(|_| ProxyError::InvalidTarget {
        header: name.clone(),
    })?;

    let unparseable = |reason: String| ProxyError::UnparseableTarget {
        header: name.clone(),
        reason,
    };
    let target = url::Url::parse(raw.trim()).map_err(|e| unparseable(e.to_string()))?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(unparseable(format!("unsupported scheme '{}'", target.scheme())));
    }
    if target.host_str().unwrap_or_default().is_empty() {
        return Err(unparseable("missing host".into()));
    }
    Ok(target)
}

/// Aborts the spawned exchange when the handler future is dropped, which
/// is how a client disconnect surfaces.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let settings = &state.relay;

    let target = match extract_target(&req_headers, &settings.rules.target_header) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "rejected request");
            state.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return e.into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        target = %target,
        "relaying request"
    );

    let hostname = target.host_str().unwrap_or_default().to_string();
    let outbound = OutboundRequest {
        method,
        headers: headers::build_outbound_headers(&req_headers, addr.ip(), &settings.rules),
        body: (!body.is_empty()).then_some(body),
        target,
    };

    // The exchange runs in its own task so a panic inside it becomes a 502.
    // Unless cancel_on_disconnect is set it also outlives a dropped client.
    let task = tokio::spawn(upstream::exchange(
        state.http_client.clone(),
        outbound,
        settings.timeout,
    ));
    let _guard = settings
        .cancel_on_disconnect
        .then(|| AbortOnDrop(task.abort_handle()));
    let result = task.await.unwrap_or(Err(UpstreamError::Panicked));

    match result {
        Ok(response) => {
            let status = match state.policy.resolve(&hostname, response.status) {
                Some(overridden) => {
                    tracing::info!(
                        request_id = %request_id,
                        host = %hostname,
                        upstream_status = response.status.as_u16(),
                        status = overridden.as_u16(),
                        "upstream status overridden"
                    );
                    state.stats.overridden.fetch_add(1, Ordering::Relaxed);
                    overridden
                }
                None => response.status,
            };
            state.stats.relayed.fetch_add(1, Ordering::Relaxed);

            let mut relayed = Response::new(Body::from(response.body));
            *relayed.status_mut() = status;
            *relayed.headers_mut() = headers::relayable_response_headers(response.headers);
            relayed
        }
        Err(e) => {
            let message = upstream::gateway_message(&e);
            tracing::error!(request_id = %request_id, host = %hostname, "{message}");
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            ProxyError::Upstream { message }.into_response()
        }
    }
}
