//! `relay-proxy run` — start the proxy server.
//!
//! Loads configuration once (explicit file, auto-detected file, or the
//! built-in defaults), builds the shared state, and serves the Axum
//! router with graceful shutdown.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::config::sources::builtin::BuiltinSource;
use crate::config::sources::file_source::FileSource;
use crate::config::{validation, ConfigSource};
use crate::error::RelayError;
use crate::logging;
use crate::server::{self, AppState, LoadedConfig};

/// File names probed in the working directory when `--config` is absent.
pub const CONFIG_CANDIDATES: &[&str] = &[
    "relay-proxy.yaml",
    "relay-proxy.yml",
    "relay-proxy.json",
    "relay-proxy.toml",
];

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let source = resolve_config_source(args.config.as_deref()).await?;
    let (mut config, version) = source.load().await?;

    if let Some(timeout) = args.timeout {
        config.relay.timeout = Some(timeout);
        validation::validate(&config).map_err(|errors| RelayError::ConfigValidation { errors })?;
    }

    let override_count = config.overrides.len();
    let target_header = config.relay.target_header.clone();

    let state = Arc::new(AppState::new(LoadedConfig {
        config: Arc::new(config),
        version,
        source_name: source.name().to_string(),
        loaded_at: Instant::now(),
    })?);

    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config = source.name(),
        target_header = %target_header,
        overrides = override_count,
        "relay-proxy started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("relay-proxy stopped");
    Ok(())
}

async fn resolve_config_source(
    explicit: Option<&Path>,
) -> Result<Box<dyn ConfigSource>, RelayError> {
    if let Some(path) = explicit {
        return Ok(Box::new(FileSource::new(path.to_path_buf())?));
    }

    for name in CONFIG_CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(Box::new(FileSource::new(path)?));
        }
    }

    tracing::info!("no config file found, using built-in defaults");
    Ok(Box::new(BuiltinSource))
}
