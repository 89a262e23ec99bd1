use std::env;
use std::time::Duration;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const REMOVE_BG_API_BASE: &str = "https://api.remove.bg/v1.0";
pub const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Base URLs of the external media services.
#[derive(Debug, Clone)]
pub struct MediaEndpoints {
    pub openai: String,
    pub remove_bg: String,
    pub cloudinary: String,
    pub request_timeout: Duration,
}

impl Default for MediaEndpoints {
    fn default() -> Self {
        Self {
            openai: OPENAI_API_BASE.into(),
            remove_bg: REMOVE_BG_API_BASE.into(),
            cloudinary: CLOUDINARY_API_BASE.into(),
            // image generation regularly takes longer than half a minute
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl MediaEndpoints {
    /// Load endpoint overrides from environment variables.
    ///
    /// Optional: SAKEGRAM_OPENAI_API_BASE, SAKEGRAM_REMOVE_BG_API_BASE,
    /// SAKEGRAM_CLOUDINARY_API_BASE
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai: env_url("SAKEGRAM_OPENAI_API_BASE").unwrap_or(defaults.openai),
            remove_bg: env_url("SAKEGRAM_REMOVE_BG_API_BASE").unwrap_or(defaults.remove_bg),
            cloudinary: env_url("SAKEGRAM_CLOUDINARY_API_BASE").unwrap_or(defaults.cloudinary),
            request_timeout: defaults.request_timeout,
        }
    }

    /// Shared HTTP client for all media services.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }
}

fn env_url(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| v.trim_end_matches('/').to_string())
}
