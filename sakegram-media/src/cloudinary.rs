use crate::error::{MediaError, Result};
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

pub const UPLOAD_FOLDER: &str = "insta-sake";

#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    /// Hosting is only enabled when all three values are present.
    pub fn from_parts(
        cloud_name: Option<&str>,
        api_key: Option<&str>,
        api_secret: Option<&str>,
    ) -> Option<Self> {
        let pick = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Some(Self {
            cloud_name: pick(cloud_name)?,
            api_key: pick(api_key)?,
            api_secret: pick(api_secret)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed uploads to Cloudinary so Instagram gets a public HTTPS URL.
pub struct CloudinaryClient {
    credentials: CloudinaryCredentials,
    api_base: String,
    http_client: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(
        credentials: CloudinaryCredentials,
        api_base: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            api_base: api_base.into(),
            http_client,
        }
    }

    /// Upload an image into the `insta-sake` folder and return its `secure_url`.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)],
            &self.credentials.api_secret,
        );

        let form = Form::new()
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
            .part("file", Part::bytes(bytes).file_name(filename.to_string()));

        let url = format!(
            "{}/{}/image/upload",
            self.api_base, self.credentials.cloud_name
        );
        let response = self.http_client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("Cloudinary returned HTTP {}", status.as_u16()));
            return Err(MediaError::Api(message));
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;
        tracing::info!("[cloudinary] Uploaded {} -> {}", filename, parsed.secure_url);
        Ok(parsed.secure_url)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, hashed with SHA-256.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
