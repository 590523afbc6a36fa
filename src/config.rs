//! Where the parser service lives and how long to wait for it.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable carrying the service base URL.
pub const API_URL_ENV: &str = "SIPVIEW_API_URL";

/// Origin used when no base URL is configured: the bundled backend's port.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8001";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Base URL of the parser service, without a trailing endpoint path.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve the effective configuration: file (if any), then the
    /// environment, then an explicit override.
    pub fn resolve(file: Option<&Path>, api_url: Option<&str>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = Some(url);
            }
        }
        if let Some(url) = api_url {
            config.base_url = Some(url.to_string());
        }
        Ok(config)
    }

    pub fn base(&self) -> &str {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/'),
            _ => DEFAULT_ORIGIN,
        }
    }

    /// Join the base URL and an endpoint path such as `/analyze`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base(), path.trim_start_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origin() {
        let config = Config::default();
        assert_eq!(config.endpoint("/analyze"), "http://127.0.0.1:8001/analyze");
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_endpoint_join() {
        let config = Config {
            base_url: Some("https://sip.example.net/api/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.endpoint("/export/csv"), "https://sip.example.net/api/export/csv");
        assert_eq!(config.endpoint("analyze"), "https://sip.example.net/api/analyze");
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sipview.toml");
        std::fs::write(&path, "base-url = \"http://backend:8001\"\ntimeout-secs = 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://backend:8001"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_explicit_override_wins() {
        let config = Config::resolve(None, Some("http://override:9000")).unwrap();
        assert_eq!(config.base(), "http://override:9000");
    }
}
