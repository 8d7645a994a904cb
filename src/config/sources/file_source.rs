//! Async file-based config source.
//!
//! [`FileSource`] implements [`ConfigSource`] for any enabled file format,
//! chosen from the file extension. It reads the file via Tokio, validates
//! the result, and records a SHA-256 hash of the content as the version.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{parse_config_str, sha256_hex, SUPPORTED_EXTENSIONS};
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::RelayError;

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    ext: String,
}

impl FileSource {
    /// Fails with [`RelayError::UnsupportedFormat`] when the extension has
    /// no enabled parser.
    pub fn new(path: PathBuf) -> Result<Self, RelayError> {
        let ext = extension(&path);
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(RelayError::UnsupportedFormat(ext));
        }
        Ok(Self { path, ext })
    }

    async fn read_content(&self) -> Result<String, RelayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                RelayError::Io(e)
            }
        })
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        match self.ext.as_str() {
            "yaml" | "yml" => "yaml",
            "json" => "json",
            _ => "toml",
        }
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), RelayError> {
        let content = self.read_content().await?;
        let config = parse_config_str(&self.ext, &content, &self.path.display().to_string())?;

        if let Err(errors) = validate(&config) {
            return Err(RelayError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let err = FileSource::new(PathBuf::from("relay-proxy.xml")).unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedFormat(ext) if ext == "xml"));
    }

    #[cfg(feature = "yaml")]
    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::new(PathBuf::from("does-not-exist.yaml")).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, RelayError::ConfigFileNotFound { .. }));
    }

    #[cfg(feature = "yaml")]
    #[tokio::test]
    async fn loads_and_hashes_yaml() {
        let path = std::env::temp_dir().join(format!("relay-proxy-{}.yaml", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "overrides:\n  \"*.example.com\": 403\n")
            .await
            .unwrap();

        let source = FileSource::new(path.clone()).unwrap();
        let (config, version) = source.load().await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(source.name(), "yaml");
        assert_eq!(config.overrides.get("*.example.com"), Some(&403));
        assert!(matches!(version, ConfigVersion::Hash(h) if h.len() == 64));
    }
}
