//! Client Configuration
//!
//! Where the content backend lives and how to talk to it. Read from a JSON
//! file and/or the environment; environment values win.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::Session;

pub const ENV_API_URL: &str = "SITE_ADMIN_API_URL";
pub const ENV_API_TIMEOUT: &str = "SITE_ADMIN_API_TIMEOUT";
pub const ENV_AUTH_TOKEN: &str = "SITE_ADMIN_AUTH_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root, e.g. `https://api.example.com`
    pub api_url: String,
    /// Request timeout; the HTTP client default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Bearer token of a previous login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            timeout_secs: None,
            token: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Configuration from the environment alone
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from a key lookup; the API URL is required
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup(ENV_API_URL).ok_or(ConfigError::Missing(ENV_API_URL))?;
        Self::new(&api_url).with_overrides(lookup)
    }

    /// File config with any environment values laid over it
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(raw) = lookup(ENV_API_TIMEOUT) {
            let secs = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_API_TIMEOUT,
                value: raw.clone(),
            })?;
            self.timeout_secs = Some(secs);
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            self.token = Some(token);
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn session(&self) -> Session {
        match &self.token {
            Some(token) => Session::with_token(token.clone()),
            None => Session::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ClientConfig::new("https://api.example.com");
        config.timeout_secs = Some(15);
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.timeout(), Some(Duration::from_secs(15)));
        assert!(!loaded.session().is_authenticated());
    }

    #[test]
    fn test_overrides_win() {
        let config = ClientConfig::new("https://file.example.com")
            .with_overrides(lookup(&[
                (ENV_API_URL, "https://env.example.com"),
                (ENV_AUTH_TOKEN, "tok"),
            ]))
            .unwrap();
        assert_eq!(config.api_url, "https://env.example.com");
        assert_eq!(config.session().token(), Some("tok"));
    }

    #[test]
    fn test_lookup_requires_url() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(ENV_API_URL))
        ));
    }

    #[test]
    fn test_bad_timeout() {
        let result = ClientConfig::from_lookup(lookup(&[
            (ENV_API_URL, "http://localhost:3000"),
            (ENV_API_TIMEOUT, "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
