use crate::error::{GraphError, Result};
use crate::types::{
    ContainerStatus, ContainerStatusResponse, CreateContainerRequest, GraphErrorEnvelope,
    IdResponse, PublishContainerRequest,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client wrapper for the Instagram Graph API
pub struct GraphClient {
    api_base: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Step 1: create a media container for an image URL. Returns the creation id.
    pub async fn create_container(
        &self,
        user_id: &str,
        image_url: &str,
        caption: &str,
        access_token: &str,
    ) -> Result<String> {
        let url = format!("{}/{}/media", self.api_base, user_id);
        let req = CreateContainerRequest {
            image_url,
            caption,
            access_token,
        };

        let response = self.http_client.post(&url).json(&req).send().await?;
        let resp: IdResponse = self.read_json(response).await?;
        Ok(resp.id)
    }

    /// Step 2: read the processing status of a container.
    pub async fn container_status(
        &self,
        creation_id: &str,
        access_token: &str,
    ) -> Result<ContainerStatus> {
        let url = format!("{}/{}", self.api_base, creation_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[("fields", "status_code"), ("access_token", access_token)])
            .send()
            .await?;
        let resp: ContainerStatusResponse = self.read_json(response).await?;
        Ok(ContainerStatus::parse(resp.status_code.as_deref()))
    }

    /// Step 3: publish a processed container. Returns the media id.
    pub async fn publish_container(
        &self,
        user_id: &str,
        creation_id: &str,
        access_token: &str,
    ) -> Result<String> {
        let url = format!("{}/{}/media_publish", self.api_base, user_id);
        let req = PublishContainerRequest {
            creation_id,
            access_token,
        };

        let response = self.http_client.post(&url).json(&req).send().await?;
        let resp: IdResponse = self.read_json(response).await?;
        Ok(resp.id)
    }

    /// Download the image the way Instagram will and check it really is one.
    pub async fn probe_image(&self, image_url: &str) -> Result<()> {
        let response = self.http_client.get(image_url).send().await?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(GraphError::InvalidImageUrl(format!(
                "Image URL returned HTTP {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            let shown = if content_type.is_empty() {
                "unknown"
            } else {
                content_type.as_str()
            };
            return Err(GraphError::InvalidImageUrl(format!(
                "Image URL is not an image (content-type: {})",
                shown
            )));
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GraphErrorEnvelope>(&body)
                .ok()
                .map(|env| env.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        format!("HTTP {}", status.as_u16())
                    } else {
                        body.clone()
                    }
                });
            return Err(GraphError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| GraphError::UnexpectedResponse(format!("{}: {}", e, body)))
    }
}
