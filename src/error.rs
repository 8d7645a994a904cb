//! Unified error types for the relay.
//!
//! Defines [`RelayError`] (process-level failures: config, startup, CLI
//! subcommands) and [`ValidationError`] for config validation failures.
//! Per-request failures live in [`ProxyError`](crate::proxy::ProxyError)
//! because they become HTTP responses rather than process exits.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub entry: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {} - {}", self.entry, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid target header name '{name}'")]
    TargetHeader { name: String },

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_listed_one_per_line() {
        let err = RelayError::ConfigValidation {
            errors: vec![
                ValidationError {
                    entry: "overrides".into(),
                    field: "api..com".into(),
                    message: "empty label".into(),
                    suggestion: None,
                },
                ValidationError {
                    entry: "relay".into(),
                    field: "timeout".into(),
                    message: "must be greater than zero".into(),
                    suggestion: Some("omit it to use the transport default".into()),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Config validation failed:\n"));
        assert!(text.contains("  overrides: api..com - empty label\n"));
        assert!(text.ends_with("(omit it to use the transport default)"));
    }
}
