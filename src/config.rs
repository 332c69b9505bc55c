//! Configuration Management
//!
//! Provider settings come from `<config_dir>/asa/config.json`, overridden by
//! `OKTAASA_*` environment variables, overridden in turn by CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::asa::auth::AsaCredentials;
use crate::asa::client::AsaClient;
use crate::asa::http::DEFAULT_API_URL;

pub const ENV_TEAM: &str = "OKTAASA_TEAM";
pub const ENV_KEY: &str = "OKTAASA_KEY";
pub const ENV_KEY_SECRET: &str = "OKTAASA_KEY_SECRET";
pub const ENV_BEARER_TOKEN: &str = "OKTAASA_BEARER_TOKEN";
pub const ENV_API_URL: &str = "OKTAASA_API_URL";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Team every API path is scoped to
    #[serde(default)]
    pub team: Option<String>,
    /// Service user API key id
    #[serde(default)]
    pub key_id: Option<String>,
    /// Service user API key secret
    #[serde(default, skip_serializing)]
    pub key_secret: Option<String>,
    /// Pre-issued bearer token, used instead of the API key when set
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
    /// API base URL
    #[serde(default)]
    pub api_url: Option<String>,
}

impl ProviderConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("asa").join("config.json"))
    }

    /// Load configuration from disk, then apply the environment
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Override fields from environment variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(team) = lookup(ENV_TEAM) {
            self.team = Some(team);
        }
        if let Some(key_id) = lookup(ENV_KEY) {
            self.key_id = Some(key_id);
        }
        if let Some(key_secret) = lookup(ENV_KEY_SECRET) {
            self.key_secret = Some(key_secret);
        }
        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            self.bearer_token = Some(token);
        }
        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_url = Some(api_url);
        }
    }

    /// Save configuration to disk
    ///
    /// Secrets are never written; they only come from the environment.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("No configuration directory on this platform")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(path)
    }

    pub fn team(&self) -> Result<&str> {
        self.team
            .as_deref()
            .filter(|t| !t.is_empty())
            .with_context(|| format!("No ASA team configured. Set {ENV_TEAM} or use --team"))
    }

    /// Get effective API URL (config > default)
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Build credentials, preferring a bearer token over the API key
    pub fn credentials(&self) -> Result<AsaCredentials> {
        if let Some(token) = &self.bearer_token {
            return Ok(AsaCredentials::from_token(token.clone()));
        }

        match (&self.key_id, &self.key_secret) {
            (Some(key_id), Some(key_secret)) => {
                Ok(AsaCredentials::service_user(key_id.clone(), key_secret.clone()))
            }
            _ => Err(anyhow::anyhow!(
                "No ASA credentials configured. Set {ENV_BEARER_TOKEN}, or {ENV_KEY} and {ENV_KEY_SECRET}"
            )),
        }
    }

    /// Build the API client this configuration describes
    pub fn client(&self) -> Result<AsaClient> {
        let client = AsaClient::new(self.team()?, self.credentials()?, self.api_url())
            .context("Failed to create ASA client")?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ProviderConfig {
            team: Some("file-team".to_string()),
            api_url: Some("https://asa.example.com/v1".to_string()),
            ..Default::default()
        };

        config.apply_env(env(&[(ENV_TEAM, "env-team"), (ENV_API_URL, "")]));

        assert_eq!(config.team().unwrap(), "env-team");
        assert_eq!(config.api_url(), "https://asa.example.com/v1");
    }

    #[test]
    fn test_missing_team_is_error() {
        assert!(ProviderConfig::default().team().is_err());
    }

    #[test]
    fn test_credentials_require_token_or_key_pair() {
        let mut config = ProviderConfig::default();
        config.apply_env(env(&[(ENV_KEY, "key")]));
        assert!(config.credentials().is_err());

        config.apply_env(env(&[(ENV_KEY_SECRET, "secret")]));
        assert!(config.credentials().is_ok());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let config = ProviderConfig {
            team: Some("acme".to_string()),
            key_secret: Some("secret".to_string()),
            bearer_token: Some("token".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("acme"));
        assert!(!json.contains("secret"));
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_default_api_url() {
        assert_eq!(ProviderConfig::default().api_url(), DEFAULT_API_URL);
    }
}
