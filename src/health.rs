//! Health payload served on `GET /health`.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, config source metadata, the size of the override
//! table, and cumulative relay statistics. Overrides are counted apart
//! from failures: a rewritten status is a successful relay.

use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub target_header: String,
    pub overrides: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_relayed: u64,
    pub requests_overridden: u64,
    pub requests_rejected: u64,
    pub requests_failed: u64,
}

#[must_use]
pub fn snapshot(state: &AppState) -> HealthResponse {
    let loaded = &state.config;

    HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("RELAY_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.short(),
            loaded_ago_seconds: loaded.loaded_at.elapsed().as_secs(),
            target_header: state.relay.rules.target_header.to_string(),
            overrides: state.policy.len(),
        },
        stats: StatsResponse {
            requests_relayed: state.stats.relayed.load(Ordering::Relaxed),
            requests_overridden: state.stats.overridden.load(Ordering::Relaxed),
            requests_rejected: state.stats.rejected.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    }
}
