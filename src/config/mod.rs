use crate::modal::ChromeConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for every dialog the app opens
    pub chrome: ChromeConfig,

    /// Event loop tick interval in milliseconds
    pub tick_rate_ms: u64,

    /// Whether to capture mouse input
    pub mouse_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome: ChromeConfig::default(),
            tick_rate_ms: 100,
            mouse_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the first default location found.
    ///
    /// An explicit path must exist; missing default files fall back to
    /// [`Config::default`]. Environment variables are applied last.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => match Self::default_paths().into_iter().find(|path| path.exists()) {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.load_from_env();
        Ok(config)
    }

    /// Candidate files, highest priority first
    fn default_paths() -> Vec<PathBuf> {
        vec![PathBuf::from("./.modalis.json"), PathBuf::from("./modalis.json")]
    }

    /// Parse a JSON configuration file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        if let Ok(tick_rate) = std::env::var("MODALIS_TICK_RATE_MS") {
            if let Ok(tick_rate) = tick_rate.parse() {
                self.tick_rate_ms = tick_rate;
            }
        }

        if let Ok(mouse) = std::env::var("MODALIS_MOUSE") {
            self.mouse_enabled = mouse.to_lowercase() == "true";
        }
    }

    /// Tick interval as a duration
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(10..=1000).contains(&self.tick_rate_ms) {
            return Err(anyhow::anyhow!("tick_rate_ms must be between 10 and 1000"));
        }

        if self.chrome.max_width < 20 {
            return Err(anyhow::anyhow!("chrome.max_width must be at least 20 columns"));
        }

        if !(10..=100).contains(&self.chrome.max_height_percent) {
            return Err(anyhow::anyhow!("chrome.max_height_percent must be between 10 and 100"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.chrome.close_on_escape);
        assert!(!config.chrome.close_on_backdrop_click);
        assert_eq!(config.tick_rate(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "tick_rate_ms": 50, "chrome": {{ "close_on_backdrop_click": true }} }}"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.tick_rate_ms, 50);
        assert!(config.chrome.close_on_backdrop_click);
        assert!(config.chrome.close_on_escape);
        assert_eq!(config.chrome.labelled_by, "modal-title");
        assert!(config.mouse_enabled);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(Config::load(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let error = Config::load_from_file(file.path()).await.unwrap_err();
        assert!(error.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.tick_rate_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chrome.max_height_percent = 150;
        assert!(config.validate().is_err());
    }
}
