//! Tag enrichment configuration

use crate::enrichment::{ClientConfig, DEFAULT_BATCH_SIZE, DEFAULT_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "HASHNODE_API_KEY";

/// Settings for the tag lookup service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Look up tag names at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// GraphQL endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Identifiers per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// API key (prefer the environment variable)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when no key is configured
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl EnrichmentConfig {
    /// Pick the credential: command line, then config, then environment
    pub fn resolve_api_key(&self, from_cli: Option<&str>) -> Option<String> {
        let env_value = std::env::var(&self.api_key_env).ok();
        first_non_blank([from_cli, self.api_key.as_deref(), env_value.as_deref()])
    }

    pub fn client_config(&self, api_key: impl Into<String>) -> ClientConfig {
        ClientConfig::new(api_key)
            .with_endpoint(self.endpoint.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn first_non_blank<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_precedence() {
        let config = EnrichmentConfig {
            api_key: Some("from-config".to_string()),
            api_key_env: "H2O_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..EnrichmentConfig::default()
        };
        assert_eq!(config.resolve_api_key(Some("from-cli")).as_deref(), Some("from-cli"));
        assert_eq!(config.resolve_api_key(None).as_deref(), Some("from-config"));
        assert_eq!(config.resolve_api_key(Some("  ")).as_deref(), Some("from-config"));
    }

    #[test]
    fn test_no_credential() {
        let config = EnrichmentConfig {
            api_key_env: "H2O_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..EnrichmentConfig::default()
        };
        assert_eq!(config.resolve_api_key(None), None);
    }

    #[test]
    fn test_client_config_carries_settings() {
        let config = EnrichmentConfig {
            endpoint: "http://localhost:4000/graphql".to_string(),
            timeout_secs: 5,
            ..EnrichmentConfig::default()
        };
        let client = config.client_config("key");
        assert_eq!(client.endpoint, "http://localhost:4000/graphql");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.api_key, "key");
    }
}
