//! Status override policy with hostname wildcard matching.
//!
//! [`OverridePolicy`] maps hostname patterns (dot-separated labels, each
//! either literal or `*`) to the upstream status that should be replaced
//! by [`OVERRIDE_STATUS`]. Lookups walk [`WildcardCandidates`] from the
//! concrete hostname towards fully wildcarded forms; the first pattern
//! present in the table decides the outcome.

use std::collections::{BTreeMap, HashMap};

use hyper::StatusCode;

/// Sentinel returned in place of a known-problematic upstream status.
pub const OVERRIDE_STATUS: StatusCode = StatusCode::IM_A_TEAPOT;

const WILDCARD: &str = "*";

/// Generalizes a hostname one label at a time, left to right.
///
/// `a.b.c.io` yields `a.b.c.io`, `*.b.c.io`, `*.*.c.io`, `*.*.*.io`,
/// `*.*.*.*`. A single-label hostname yields only itself.
#[derive(Debug, Clone)]
pub struct WildcardCandidates<'a> {
    labels: Vec<&'a str>,
    started: bool,
}

impl<'a> WildcardCandidates<'a> {
    #[must_use]
    pub fn new(hostname: &'a str) -> Self {
        let labels = if hostname.is_empty() {
            Vec::new()
        } else {
            hostname.split('.').collect()
        };
        Self {
            labels,
            started: false,
        }
    }
}

impl Iterator for WildcardCandidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        if self.started {
            if self.labels.len() == 1 {
                return None;
            }
            let label = self.labels.iter_mut().find(|l| **l != WILDCARD)?;
            *label = WILDCARD;
        }
        self.started = true;
        Some(self.labels.join("."))
    }
}

/// Immutable lookup table of `(hostname pattern, expected status)`.
#[derive(Debug, Clone, Default)]
pub struct OverridePolicy {
    entries: HashMap<String, StatusCode>,
}

impl OverridePolicy {
    /// Build the table from config entries. Patterns are lowercased; entries
    /// whose status is not a valid HTTP status are skipped (validation
    /// rejects them before this point).
    #[must_use]
    pub fn from_entries(entries: &BTreeMap<String, u16>) -> Self {
        let entries = entries
            .iter()
            .filter_map(|(pattern, code)| {
                StatusCode::from_u16(*code)
                    .ok()
                    .map(|status| (pattern.to_ascii_lowercase(), status))
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most specific pattern configured for `hostname`, if any.
    #[must_use]
    pub fn lookup(&self, hostname: &str) -> Option<(String, StatusCode)> {
        let hostname = hostname.to_ascii_lowercase();
        WildcardCandidates::new(&hostname).find_map(|candidate| {
            self.entries
                .get(&candidate)
                .map(|status| (candidate, *status))
        })
    }

    /// Returns [`OVERRIDE_STATUS`] when the most specific pattern matching
    /// `hostname` expects exactly `observed`.
    #[must_use]
    pub fn resolve(&self, hostname: &str, observed: StatusCode) -> Option<StatusCode> {
        match self.lookup(hostname) {
            Some((_, expected)) if expected == observed => Some(OVERRIDE_STATUS),
            _ => None,
        }
    }
}
