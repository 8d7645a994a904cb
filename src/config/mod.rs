//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and
//! the [`ConfigVersion`] enum reported by the health endpoint. The config
//! is read once at startup; request handling only ever sees the immutable
//! result. Submodules provide the data model, validation logic, and
//! concrete source implementations.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::RelayError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
    Builtin,
}

impl ConfigVersion {
    /// Short form for display: the first 8 hex digits of a hash.
    #[must_use]
    pub fn short(&self) -> String {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h).to_string(),
            Self::Builtin => "builtin".to_string(),
        }
    }
}

// async_trait keeps ConfigSource usable as Box<dyn ConfigSource>.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), RelayError>;
}
