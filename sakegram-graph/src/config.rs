use crate::error::{GraphError, Result};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Tunables for talking to the Instagram Graph API.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub api_base: String,
    /// How many times the container status is checked before publishing.
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Fetch the image URL before creating a container to make sure
    /// Instagram will be able to download it.
    pub probe_images: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_attempts: 10,
            poll_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            probe_images: true,
        }
    }
}

impl GraphConfig {
    /// Load overrides from `SAKEGRAM_GRAPH_*` environment variables.
    ///
    /// Optional: SAKEGRAM_GRAPH_API_BASE, SAKEGRAM_GRAPH_POLL_ATTEMPTS,
    /// SAKEGRAM_GRAPH_POLL_INTERVAL_MS
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base = std::env::var("SAKEGRAM_GRAPH_API_BASE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);

        Self {
            api_base,
            poll_attempts: std::env::var("SAKEGRAM_GRAPH_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.poll_attempts),
            poll_interval: std::env::var("SAKEGRAM_GRAPH_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            ..defaults
        }
    }
}

/// Account credentials, snapshotted from settings for one publish attempt.
#[derive(Debug, Clone, Default)]
pub struct GraphCredentials {
    pub access_token: Option<String>,
    pub instagram_user_id: Option<String>,
    pub public_base_url: Option<String>,
}

impl GraphCredentials {
    /// Returns `(access_token, instagram_user_id)` or the name of the
    /// first missing setting.
    pub fn require(&self) -> Result<(&str, &str)> {
        let token = non_empty(&self.access_token)
            .ok_or_else(|| GraphError::Config("ACCESS_TOKEN is missing".into()))?;
        let user_id = non_empty(&self.instagram_user_id)
            .ok_or_else(|| GraphError::Config("INSTAGRAM_USER_ID is missing".into()))?;
        Ok((token, user_id))
    }

    pub fn public_base_url(&self) -> Option<&str> {
        non_empty(&self.public_base_url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_defaults() {
        std::env::remove_var("SAKEGRAM_GRAPH_API_BASE");
        std::env::remove_var("SAKEGRAM_GRAPH_POLL_ATTEMPTS");
        std::env::remove_var("SAKEGRAM_GRAPH_POLL_INTERVAL_MS");

        let config = GraphConfig::from_env();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.poll_attempts, 10);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!(config.probe_images);
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        std::env::set_var("SAKEGRAM_GRAPH_API_BASE", "http://127.0.0.1:9999/v19.0/");
        std::env::set_var("SAKEGRAM_GRAPH_POLL_ATTEMPTS", "3");
        std::env::set_var("SAKEGRAM_GRAPH_POLL_INTERVAL_MS", "50");

        let config = GraphConfig::from_env();
        assert_eq!(config.api_base, "http://127.0.0.1:9999/v19.0");
        assert_eq!(config.poll_attempts, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(50));

        std::env::remove_var("SAKEGRAM_GRAPH_API_BASE");
        std::env::remove_var("SAKEGRAM_GRAPH_POLL_ATTEMPTS");
        std::env::remove_var("SAKEGRAM_GRAPH_POLL_INTERVAL_MS");
    }

    #[test]
    #[serial]
    fn test_zero_poll_attempts_ignored() {
        std::env::set_var("SAKEGRAM_GRAPH_POLL_ATTEMPTS", "0");
        assert_eq!(GraphConfig::from_env().poll_attempts, 10);
        std::env::remove_var("SAKEGRAM_GRAPH_POLL_ATTEMPTS");
    }

    #[test]
    fn test_credentials_require_token_first() {
        let creds = GraphCredentials::default();
        let err = creds.require().unwrap_err();
        assert_eq!(err.to_string(), "ACCESS_TOKEN is missing");

        let creds = GraphCredentials {
            access_token: Some("tok".into()),
            instagram_user_id: Some("  ".into()),
            public_base_url: None,
        };
        let err = creds.require().unwrap_err();
        assert_eq!(err.to_string(), "INSTAGRAM_USER_ID is missing");
    }

    #[test]
    fn test_credentials_ok() {
        let creds = GraphCredentials {
            access_token: Some("tok".into()),
            instagram_user_id: Some("1784".into()),
            public_base_url: Some("".into()),
        };
        assert_eq!(creds.require().unwrap(), ("tok", "1784"));
        assert_eq!(creds.public_base_url(), None);
    }
}
