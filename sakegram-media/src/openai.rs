use crate::error::{MediaError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;

const VISION_MODEL: &str = "gpt-4o";
const IMAGE_MODEL: &str = "dall-e-3";

const ANALYZE_PROMPT: &str = "この写真に写っている日本酒の銘柄を特定してください（銘柄名は日本語で返してください）。また、その日本酒のイメージに合う背景（例：雪景色、桜、伝統的な和室など）を英語のプロンプトとして提案してください。JSON形式で { \"brand\": \"...\", \"background_prompt\": \"...\" } という形で返してください。";

/// Vision model answer for a bottle photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAnalysis {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub background_prompt: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// Fails with `NotConfigured` when no key is set.
    pub fn new(
        api_key: Option<&str>,
        api_base: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MediaError::NotConfigured("OpenAI API Key not configured".into()))?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: api_base.into(),
            http_client,
        })
    }

    /// Identify the sake brand in a photo and suggest a background scene.
    pub async fn analyze_label(&self, image: &[u8], mime: &str) -> Result<BrandAnalysis> {
        let data_url = format!("data:{};base64,{}", mime, BASE64.encode(image));
        let body = json!({
            "model": VISION_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYZE_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "response_format": { "type": "json_object" }
        });

        let resp: ChatResponse = self.post_json("chat/completions", &body).await?;
        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MediaError::InvalidResponse("empty completion".into()))?;

        serde_json::from_str(&content)
            .map_err(|e| MediaError::InvalidResponse(format!("analysis is not JSON: {}", e)))
    }

    /// Generate a 1024x1024 backdrop for a product shot. Returns PNG bytes.
    pub async fn generate_background(&self, prompt: &str) -> Result<Vec<u8>> {
        let body = json!({
            "model": IMAGE_MODEL,
            "prompt": background_prompt(prompt),
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json"
        });

        let resp: ImagesResponse = self.post_json("images/generations", &body).await?;
        let encoded = resp
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| MediaError::InvalidResponse("no image returned".into()))?;

        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| MediaError::InvalidResponse(format!("bad base64 image: {}", e)))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("OpenAI returned HTTP {}", status.as_u16()));
            return Err(MediaError::Api(message));
        }

        serde_json::from_str(&text).map_err(|e| MediaError::InvalidResponse(e.to_string()))
    }
}

/// Wrap the user's scene description so the model paints scenery only.
pub fn background_prompt(scene: &str) -> String {
    format!(
        "A high quality, photorealistic background for a sake bottle product shot. {}. No text, no bottles, just the background scenery.",
        scene
    )
}
