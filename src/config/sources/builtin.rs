//! Config source used when no config file is found: [`Config::default`].

use async_trait::async_trait;

use crate::config::model::Config;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::RelayError;

pub struct BuiltinSource;

#[async_trait]
impl ConfigSource for BuiltinSource {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), RelayError> {
        Ok((Config::default(), ConfigVersion::Builtin))
    }
}
