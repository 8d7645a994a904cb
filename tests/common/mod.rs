//! Shared harness: an in-process upstream and a relay bound to loopback.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Path};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::compression::CompressionLayer;

use relay_proxy::config::model::Config;
use relay_proxy::config::ConfigVersion;
use relay_proxy::server::{self, AppState, LoadedConfig};

/// What the upstream saw, as reported by `/echo`.
#[derive(Debug, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Echo {
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let pairs: Vec<(String, String)> = headers
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    Json(serde_json::json!({
        "method": method.as_str(),
        "headers": pairs,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("upstream {code}")).into_response()
}

async fn fixed_headers() -> Response {
    let mut response = Response::new(Body::from("ok"));
    let headers = response.headers_mut();
    headers.append("x-upstream", HeaderValue::from_static("a"));
    headers.append("x-upstream", HeaderValue::from_static("b"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("content-encoding", HeaderValue::from_static("identity"));
    response
}

pub fn large_text() -> String {
    "relay me ".repeat(512)
}

async fn compressed() -> String {
    large_text()
}

async fn size(body: Bytes) -> String {
    body.len().to_string()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

pub async fn start_upstream() -> SocketAddr {
    let router = Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/headers", get(fixed_headers))
        .route("/compressed", get(compressed))
        .route("/slow", get(slow))
        .route("/size", any(size))
        .route("/moved", any(|| async { Redirect::temporary("/echo") }))
        .route("/found", any(|| async { Redirect::to("/echo") }))
        .route("/moved-forbidden", get(|| async { Redirect::temporary("/status/403") }))
        .layer(DefaultBodyLimit::disable())
        .layer(CompressionLayer::new());

    serve_upstream(router).await
}

/// Upstream whose `/finish` handler sleeps, then raises the returned flag.
/// The flag stays down if the relay drops the connection first.
pub async fn start_tracked_upstream() -> (SocketAddr, Arc<AtomicBool>) {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let router = Router::new().route(
        "/finish",
        get(move || {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(400)).await;
                flag.store(true, Ordering::SeqCst);
                "finished"
            }
        }),
    );

    (serve_upstream(router).await, finished)
}

async fn serve_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A loopback address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn config_with_overrides(entries: &[(&str, u16)]) -> Config {
    Config {
        overrides: entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
        ..Config::default()
    }
}

pub struct Relay {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Relay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `run`'s default `--max-body`.
pub const DEFAULT_MAX_BODY: usize = 10_485_760;

pub async fn start_relay(config: Config) -> Relay {
    start_relay_with_limit(config, DEFAULT_MAX_BODY).await
}

pub async fn start_relay_with_limit(config: Config, max_body: usize) -> Relay {
    let state = Arc::new(
        AppState::new(LoadedConfig {
            config: Arc::new(config),
            version: ConfigVersion::Hash("0123456789abcdef".into()),
            source_name: "test".into(),
            loaded_at: Instant::now(),
        })
        .unwrap(),
    );

    let router = server::build_router(state.clone(), max_body);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    Relay {
        addr,
        state,
        shutdown: Some(shutdown_tx),
    }
}
