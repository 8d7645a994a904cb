//! `relay-proxy init` — generate a starter configuration file.
//!
//! Writes the built-in defaults with every option spelled out, in YAML,
//! JSON, or TOML.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::RelayError;

pub fn execute(args: &InitArgs) -> Result<(), RelayError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("relay-proxy.{}", args.format.extension())));

    if output.exists() {
        return Err(RelayError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat) -> &'static str {
    match format {
        ConfigFormat::Yaml => YAML_TEMPLATE,
        ConfigFormat::Json => JSON_TEMPLATE,
        ConfigFormat::Toml => TOML_TEMPLATE,
    }
}

const YAML_TEMPLATE: &str = r#"# relay-proxy config
#
# All values shown are defaults.

server:
  cors: true                 # Permissive CORS on every response
  compression: true          # Compress responses when the client accepts it

relay:
  target_header: x-proxy-url # Header carrying the absolute upstream URL
  forward_user_agent: false  # Drop the client's User-Agent before relaying
  # timeout: 10000           # Upstream timeout in ms (unset: no limit)
  cancel_on_disconnect: false

# Upstream statuses replaced by 418. Patterns match one label per '*':
# "*.example.com" matches "api.example.com" but not "example.com".
overrides:
  api.binance.org: 403
"#;

const JSON_TEMPLATE: &str = r#"{
  "server": {
    "cors": true,
    "compression": true
  },
  "relay": {
    "target_header": "x-proxy-url",
    "forward_user_agent": false,
    "cancel_on_disconnect": false
  },
  "overrides": {
    "api.binance.org": 403
  }
}
"#;

const TOML_TEMPLATE: &str = r#"# relay-proxy config
#
# All values shown are defaults.

# Upstream statuses replaced by 418. Patterns match one label per '*'.
[overrides]
"api.binance.org" = 403

[server]
cors = true
compression = true

[relay]
target_header = "x-proxy-url"
forward_user_agent = false
# timeout = 10000
cancel_on_disconnect = false
"#;
