use crate::error::{MediaError, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Client for the remove.bg cut-out API.
pub struct RemoveBgClient {
    api_key: String,
    api_base: String,
    http_client: reqwest::Client,
}

impl RemoveBgClient {
    pub fn new(
        api_key: Option<&str>,
        api_base: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MediaError::NotConfigured("Remove.bg API Key not configured".into()))?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: api_base.into(),
            http_client,
        })
    }

    /// Cut the subject out of a photo. Returns a PNG with transparent background.
    pub async fn remove_background(&self, image: Vec<u8>, filename: &str) -> Result<Vec<u8>> {
        let form = Form::new()
            .part("image_file", Part::bytes(image).file_name(filename.to_string()))
            .text("size", "auto");

        let url = format!("{}/removebg", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message =
                describe_error(&body).unwrap_or_else(|| "Remove.bg request failed".to_string());
            tracing::warn!("[remove.bg] HTTP {}: {}", status.as_u16(), message);
            return Err(MediaError::Api(message));
        }

        Ok(body.to_vec())
    }
}

/// `{"errors":[{"title":"...","code":"..."}]}` -> `"title (code)"`
pub fn describe_error(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    let first = envelope.errors.into_iter().next()?;
    if first.title.is_none() && first.code.is_none() {
        return None;
    }

    let title = first
        .title
        .unwrap_or_else(|| "Remove.bg error".to_string());
    Some(match first.code {
        Some(code) => format!("{} ({})", title, code),
        None => title,
    })
}
