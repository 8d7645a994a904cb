//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding relay settings,
//! the override policy, HTTP client, stats, and uptime), [`build_router`]
//! for constructing the Axum router with middleware layers,
//! [`build_http_client`] for the connection-pooled, decompressing,
//! redirect-following hyper client, and [`shutdown_signal`] for
//! SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::decompression::Decompression;
use tower_http::follow_redirect::policy::{self, And, CloneBodyFn, PolicyExt};
use tower_http::follow_redirect::FollowRedirect;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::Config;
use crate::config::ConfigVersion;
use crate::error::RelayError;
use crate::middleware::health_probe;
use crate::proxy::policy::OverridePolicy;
use crate::proxy::{self, RelaySettings};

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Arc<Config>,
    pub version: ConfigVersion,
    pub source_name: String,
    pub loaded_at: Instant,
}

#[derive(Debug)]
pub struct Stats {
    pub relayed: AtomicU64,
    pub overridden: AtomicU64,
    pub rejected: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            relayed: AtomicU64::new(0),
            overridden: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
type CloneBody = fn(&Full<Bytes>) -> Option<Full<Bytes>>;
/// Standard limits plus replaying buffered bodies on 307/308.
pub type RedirectPolicy = And<policy::Standard, CloneBodyFn<CloneBody>>;
pub type HttpClient =
    FollowRedirect<Decompression<Client<HttpsConnector, Full<Bytes>>>, RedirectPolicy>;

pub struct AppState {
    pub config: LoadedConfig,
    pub relay: RelaySettings,
    pub policy: OverridePolicy,
    pub http_client: HttpClient,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Derive the request-time state from a loaded config. Nothing here is
    /// mutated while requests are in flight.
    pub fn new(config: LoadedConfig) -> Result<Self, RelayError> {
        let relay = RelaySettings::from_options(&config.config.relay)?;
        let policy = OverridePolicy::from_entries(&config.config.overrides);
        Ok(Self {
            config,
            relay,
            policy,
            http_client: build_http_client(),
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    let client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https);

    // Redirects are followed and the final response relayed. Request bodies
    // are already buffered, so 307/308 can resend them.
    let clone_body: CloneBody = |body| Some(body.clone());
    let redirects = policy::Standard::default()
        .and::<_, Full<Bytes>, hyper_util::client::legacy::Error>(policy::clone_body_fn(
            clone_body,
        ));

    // Upstream bodies are decoded before relaying, which is why
    // content-encoding is never copied to the client response.
    FollowRedirect::with_policy(Decompression::new(client), redirects)
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    let server = state.config.config.server.clone();

    let mut router = Router::new()
        .fallback(proxy::relay_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            health_probe,
        ))
        .layer(
            ServiceBuilder::new()
                // Transport failures are logged by the handler; the trace
                // layer must not report them a second time.
                .layer(TraceLayer::new_for_http().on_failure(()))
                .layer(RequestBodyLimitLayer::new(max_body))
                // `max_body` is the only cap; axum's 2 MiB extractor default is lifted.
                .layer(DefaultBodyLimit::disable()),
        );

    if server.compression {
        router = router.layer(CompressionLayer::new());
    }
    if server.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

pub async fn shutdown_signal() {
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
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
