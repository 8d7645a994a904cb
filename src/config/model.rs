//! Serde data structures for the relay configuration file.
//!
//! Contains [`Config`] (the root), [`ServerOptions`], [`RelayOptions`],
//! and the status override table. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_HEADER: &str = "x-proxy-url";

const fn default_true() -> bool {
    true
}

fn default_target_header() -> String {
    DEFAULT_TARGET_HEADER.to_string()
}

/// Hosts known to reject the proxy with an uninformative status.
#[must_use]
pub fn default_overrides() -> BTreeMap<String, u16> {
    BTreeMap::from([("api.binance.org".to_string(), 403)])
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_target_header(v: &str) -> bool {
    v == DEFAULT_TARGET_HEADER
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "ServerOptions::is_default")]
    pub server: ServerOptions,

    #[serde(default, skip_serializing_if = "RelayOptions::is_default")]
    pub relay: RelayOptions,

    /// Hostname pattern -> upstream status replaced by the sentinel.
    #[serde(default = "default_overrides")]
    pub overrides: BTreeMap<String, u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerOptions::default(),
            relay: RelayOptions::default(),
            overrides: default_overrides(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerOptions {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub cors: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub compression: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            cors: default_true(),
            compression: default_true(),
        }
    }
}

impl ServerOptions {
    fn is_default(&self) -> bool {
        self.cors && self.compression
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayOptions {
    /// Request header carrying the absolute upstream URL.
    #[serde(
        default = "default_target_header",
        skip_serializing_if = "is_default_target_header"
    )]
    pub target_header: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub forward_user_agent: bool,

    /// Upstream timeout in milliseconds. Unset leaves timing to the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub cancel_on_disconnect: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            target_header: default_target_header(),
            forward_user_agent: false,
            timeout: None,
            cancel_on_disconnect: false,
        }
    }
}

impl RelayOptions {
    fn is_default(&self) -> bool {
        is_default_target_header(&self.target_header)
            && !self.forward_user_agent
            && self.timeout.is_none()
            && !self.cancel_on_disconnect
    }
}
