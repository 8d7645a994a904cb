//! Single outbound exchange with the upstream.
//!
//! [`exchange`] sends one request (no retries), collects the full
//! response body, and reports failures as [`UpstreamError`].
//! [`gateway_message`] renders a failure as the text returned to the
//! client with a 502.

use std::error::Error as StdError;
use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tower::ServiceExt;

use super::headers::HeaderList;
use crate::server::HttpClient;

#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub target: url::Url,
    pub headers: HeaderList,
    /// `None` when the inbound request carried no body.
    pub body: Option<Bytes>,
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid outbound request")]
    Build(#[from] axum::http::Error),

    #[error("upstream request failed")]
    Transport(#[source] hyper_util::client::legacy::Error),

    #[error("failed to read upstream response body")]
    Body(#[source] Box<dyn StdError + Send + Sync>),

    #[error("upstream did not respond within {0}ms")]
    Timeout(u64),

    #[error("upstream task panicked")]
    Panicked,
}

pub async fn exchange(
    client: HttpClient,
    request: OutboundRequest,
    timeout: Option<Duration>,
) -> Result<UpstreamResponse, UpstreamError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, send(client, request))
            .await
            .map_err(|_| {
                UpstreamError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            })?,
        None => send(client, request).await,
    }
}

async fn send(
    client: HttpClient,
    request: OutboundRequest,
) -> Result<UpstreamResponse, UpstreamError> {
    let mut builder = hyper::Request::builder()
        .method(request.method)
        .uri(request.target.as_str());

    for (name, value) in request.headers {
        builder = builder.header(name, value);
    }

    // An empty body ends the stream immediately, so hyper sends no
    // content-length or transfer-encoding for it.
    let req = builder.body(Full::new(request.body.unwrap_or_default()))?;

    let response = client.oneshot(req).await.map_err(UpstreamError::Transport)?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await.map_err(UpstreamError::Body)?.to_bytes();

    Ok(UpstreamResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

fn io_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a std::io::Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        current = e.source();
    }
    None
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

/// Human-readable 502 body: the IO error kind (and errno) when one is in
/// the source chain, followed by the full error chain.
#[must_use]
pub fn gateway_message(err: &UpstreamError) -> String {
    let chain = error_chain(err);
    match io_error(err) {
        Some(io) => match io.raw_os_error() {
            Some(errno) => format!("Bad Gateway: {:?} (errno {errno}) {chain}", io.kind()),
            None => format!("Bad Gateway: {:?} {chain}", io.kind()),
        },
        None => format!("Bad Gateway: {chain}"),
    }
}
