//! relay-proxy is a transparent HTTP forwarding proxy.
//!
//! Each inbound request names its upstream in a target header
//! (`x-proxy-url` by default). The request is forwarded with sanitized
//! headers and an extended forwarded-for chain, and the upstream response
//! is relayed back, except that configured hosts answering with a known
//! rejection status are reported as `418 I'm a teapot` instead.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration model, validation, and the
//!   [`ConfigSource`](config::ConfigSource) trait. Loaded once at startup.
//! - [`error`] -- Process-level error types using `thiserror`.
//! - [`health`] -- Health payload with relay statistics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- The `GET /health` probe layer.
//! - [`proxy`] -- Core relay: header transform, status override policy,
//!   and the single outbound exchange.
//! - [`server`] -- Axum server setup, shared application state, HTTP client,
//!   and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
