use super::client::GraphClient;
use super::config::{GraphConfig, GraphCredentials};
use super::media_url::{check_public_url, resolve_image_url};
use crate::error::{GraphError, Result};

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMedia {
    pub image_url: String,
    pub creation_id: String,
    pub media_id: String,
}

/// Runs the three-step container protocol against the Graph API:
/// create container, wait for processing, publish.
pub struct InstagramPublisher {
    config: GraphConfig,
    client: GraphClient,
}

impl InstagramPublisher {
    pub fn new(config: GraphConfig) -> Self {
        let client = GraphClient::new(config.api_base.clone(), config.request_timeout);
        Self { config, client }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    pub async fn publish(
        &self,
        credentials: &GraphCredentials,
        image_path: &str,
        caption: &str,
    ) -> Result<PublishedMedia> {
        let (access_token, user_id) = credentials.require()?;
        let image_url = resolve_image_url(image_path, credentials.public_base_url())?;

        check_public_url(&image_url)?;
        if self.config.probe_images {
            self.client.probe_image(&image_url).await?;
        }

        tracing::info!("[instagram] Creating media container for: {}", image_url);
        let creation_id = self
            .client
            .create_container(user_id, &image_url, caption, access_token)
            .await?;
        tracing::info!(
            "[instagram] Container created: {}. Waiting for processing...",
            creation_id
        );

        self.wait_until_ready(&creation_id, access_token).await?;

        let media_id = self
            .client
            .publish_container(user_id, &creation_id, access_token)
            .await?;
        tracing::info!("[instagram] Published media {}", media_id);

        Ok(PublishedMedia {
            image_url,
            creation_id,
            media_id,
        })
    }

    /// Poll the container until it is ready. Running out of attempts is not
    /// an error: the publish call reports whatever Instagram thinks.
    async fn wait_until_ready(&self, creation_id: &str, access_token: &str) -> Result<()> {
        let attempts = self.config.poll_attempts;
        for attempt in 1..=attempts {
            let status = self
                .client
                .container_status(creation_id, access_token)
                .await?;

            if status.is_ready() {
                return Ok(());
            }
            if status.is_failed() {
                tracing::warn!(
                    "[instagram] Container {} reported {:?}",
                    creation_id,
                    status
                );
                return Err(GraphError::ProcessingFailed);
            }

            tracing::debug!(
                "[instagram] Container {} is {:?} (check {}/{})",
                creation_id,
                status,
                attempt,
                attempts
            );
            if attempt < attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        tracing::warn!(
            "[instagram] Container {} not finished after {} checks, publishing anyway",
            creation_id,
            attempts
        );
        Ok(())
    }
}
