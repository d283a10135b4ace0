//! File-backed configuration store.
//!
//! # Design
//! - Every load and save passes through `validate_and_normalize`.
//! - Writes go to `<path>.tmp` and are renamed into place; readers never observe a
//!   partially written document.
//! - A missing document is created from `Config::initial()` on first load.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;

/// Handle to the configuration document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Bind a store to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPath`] when the path is blank.
    pub fn new(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        if path.to_string_lossy().trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        Ok(Self { path })
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, creating it with defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, parsed, or (on first use)
    /// written.
    pub async fn load_or_create(&self) -> ConfigResult<Config> {
        match fs::try_exists(&self.path).await {
            Ok(true) => self.load().await,
            Ok(false) => {
                let config = Config::initial();
                self.save(&config).await?;
                info!(path = %self.path.display(), "created default configuration");
                Ok(config.normalized())
            }
            Err(source) => Err(ConfigError::io("config.exists", &self.path, source)),
        }
    }

    /// Load and normalise an existing document.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not valid JSON.
    pub async fn load(&self) -> ConfigResult<Config> {
        let raw = fs::read(&self.path)
            .await
            .map_err(|source| ConfigError::io("config.read", &self.path, source))?;
        let config: Config = serde_json::from_slice(&raw)
            .map_err(|source| ConfigError::json("config.parse", &self.path, source))?;
        Ok(config.normalized())
    }

    /// Normalise `config` and write it atomically.
    ///
    /// Returns the document exactly as written.
    ///
    /// # Errors
    ///
    /// Returns an error when the parent directory cannot be created or the document
    /// cannot be written or renamed into place.
    pub async fn save(&self, config: &Config) -> ConfigResult<Config> {
        let normalized = config.clone().normalized();
        let mut body = serde_json::to_vec_pretty(&normalized)
            .map_err(|source| ConfigError::json("config.encode", &self.path, source))?;
        body.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::io("config.create_dir", parent, source))?;
        }

        let staging = staging_path(&self.path);
        if let Err(source) = fs::write(&staging, &body).await {
            discard(&staging).await;
            return Err(ConfigError::io("config.write", &staging, source));
        }
        if let Err(source) = fs::rename(&staging, &self.path).await {
            discard(&staging).await;
            return Err(ConfigError::io("config.rename", &self.path, source));
        }
        Ok(normalized)
    }
}

/// Load `path`, creating a default document when it is missing.
///
/// # Errors
///
/// See [`ConfigStore::load_or_create`].
pub async fn load_or_create(path: impl Into<PathBuf>) -> ConfigResult<Config> {
    ConfigStore::new(path)?.load_or_create().await
}

/// Normalise and atomically write `config` to `path`.
///
/// # Errors
///
/// See [`ConfigStore::save`].
pub async fn save(path: impl Into<PathBuf>, config: &Config) -> ConfigResult<Config> {
    ConfigStore::new(path)?.save(config).await
}

fn staging_path(path: &Path) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".tmp");
    PathBuf::from(raw)
}

async fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path).await
        && err.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %err, "failed to remove staged configuration");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn blank_path_is_rejected() {
        assert!(matches!(ConfigStore::new("  "), Err(ConfigError::EmptyPath)));
    }

    #[test]
    fn staging_path_appends_suffix() {
        assert_eq!(
            staging_path(Path::new("dir/config.json")),
            PathBuf::from("dir/config.json.tmp")
        );
    }

    #[tokio::test]
    async fn load_or_create_seeds_missing_document() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::new(&path)?;

        let config = store.load_or_create().await?;
        assert_eq!(config, Config::initial().normalized());
        assert!(path.exists());
        assert!(!staging_path(&path).exists());

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\n  \"WebListenAddr\": \"127.0.0.1:8123\""));
        Ok(())
    }

    #[tokio::test]
    async fn save_normalises_before_writing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        let written = save(
            &path,
            &Config {
                interval_minutes: -4,
                retention: 0,
                ..Config::initial()
            },
        )
        .await?;
        assert_eq!(written.interval_minutes, 1);
        assert_eq!(written.retention, 30);

        let reloaded = load_or_create(&path).await?;
        assert_eq!(reloaded, written);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_document_reports_parse_failure() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;

        let err = load_or_create(&path).await.expect_err("parse failure");
        assert_eq!(err.operation(), Some("config.parse"));
        Ok(())
    }
}
