//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for a usable
//! target header, a sane upstream timeout, well-formed hostname patterns,
//! and real HTTP status codes in the override table. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use axum::http::HeaderName;

use super::model::Config;
use crate::error::ValidationError;
use crate::proxy::headers::DROPPED_REQUEST_HEADERS;

/// Validate a target header name. Returns `Ok(())` or a human-readable error.
pub fn validate_target_header(name: &str) -> Result<(), String> {
    let parsed = name
        .parse::<HeaderName>()
        .map_err(|_| format!("'{name}' is not a valid header name"))?;
    if DROPPED_REQUEST_HEADERS.contains(&parsed.as_str()) {
        return Err(format!(
            "'{name}' is a header the relay regenerates or drops"
        ));
    }
    Ok(())
}

/// Validate a hostname pattern. Returns `Ok(())` or a human-readable error.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("pattern cannot be empty".into());
    }
    if pattern == "*" {
        return Err("a bare '*' never matches; single-label hosts are compared literally".into());
    }
    for label in pattern.split('.') {
        if label.is_empty() {
            return Err(format!("'{pattern}' contains an empty label"));
        }
        if label != "*"
            && !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "label '{label}' must be '*' or contain only letters, digits, '-' and '_'"
            ));
        }
    }
    // Lookups only ever wildcard labels from the left, so a '*' after a
    // literal label could never be reached.
    if widened_pattern(pattern).is_some() {
        return Err(format!(
            "'{pattern}' has a '*' after a literal label and can never match"
        ));
    }
    Ok(())
}

/// For a pattern with a `*` behind a literal label, the reachable pattern
/// that wildcards every label up to the last `*`.
fn widened_pattern(pattern: &str) -> Option<String> {
    let labels: Vec<&str> = pattern.split('.').collect();
    let last_wildcard = labels.iter().rposition(|l| *l == "*")?;
    if labels[..last_wildcard].iter().all(|l| *l == "*") {
        return None;
    }
    let widened: Vec<&str> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| if i <= last_wildcard { "*" } else { *l })
        .collect();
    Some(widened.join("."))
}

/// Validate an override status. Returns `Ok(())` or a human-readable error.
pub fn validate_status(status: u16) -> Result<(), String> {
    if (100..=599).contains(&status) {
        Ok(())
    } else {
        Err(format!("{status} is not an HTTP status code (expected 100-599)"))
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_target_header(&config.relay.target_header) {
        errors.push(ValidationError {
            entry: "relay".into(),
            field: "target_header".into(),
            message: msg,
            suggestion: Some("use 'x-proxy-url' or 'proxy-url'".into()),
        });
    }

    if config.relay.timeout == Some(0) {
        errors.push(ValidationError {
            entry: "relay".into(),
            field: "timeout".into(),
            message: "must be greater than zero".into(),
            suggestion: Some("omit it to use the transport default".into()),
        });
    }

    for (pattern, status) in &config.overrides {
        if let Err(msg) = validate_pattern(pattern) {
            errors.push(ValidationError {
                entry: "overrides".into(),
                field: pattern.clone(),
                message: msg,
                suggestion: pattern
                    .strip_prefix('.')
                    .map(|rest| format!("did you mean '*.{rest}'?"))
                    .or_else(|| {
                        widened_pattern(pattern).map(|p| format!("did you mean '{p}'?"))
                    }),
            });
        }
        if let Err(msg) = validate_status(*status) {
            errors.push(ValidationError {
                entry: "overrides".into(),
                field: pattern.clone(),
                message: msg,
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let timeout = config
        .relay
        .timeout
        .map_or_else(|| "transport default".to_string(), |t| format!("{t}ms"));

    let mut lines = vec![
        format!("  target header: {}", config.relay.target_header),
        format!("  timeout: {timeout}"),
        format!("  {} status overrides", config.overrides.len()),
    ];
    for (pattern, status) in &config.overrides {
        lines.push(format!("    {pattern}  {status} -> 418"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
