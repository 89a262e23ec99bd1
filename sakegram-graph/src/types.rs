use serde::{Deserialize, Serialize};

/// Body of `POST /{ig-user-id}/media`
#[derive(Debug, Clone, Serialize)]
pub struct CreateContainerRequest<'a> {
    pub image_url: &'a str,
    pub caption: &'a str,
    pub access_token: &'a str,
}

/// Body of `POST /{ig-user-id}/media_publish`
#[derive(Debug, Clone, Serialize)]
pub struct PublishContainerRequest<'a> {
    pub creation_id: &'a str,
    pub access_token: &'a str,
}

/// Both container creation and publish answer with `{"id": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerStatusResponse {
    #[serde(default)]
    pub status_code: Option<String>,
}

/// Processing state of a media container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Finished,
    InProgress,
    Published,
    Error,
    Expired,
    Unknown,
}

impl ContainerStatus {
    pub fn parse(code: Option<&str>) -> Self {
        match code {
            Some("FINISHED") => ContainerStatus::Finished,
            Some("IN_PROGRESS") => ContainerStatus::InProgress,
            Some("PUBLISHED") => ContainerStatus::Published,
            Some("ERROR") => ContainerStatus::Error,
            Some("EXPIRED") => ContainerStatus::Expired,
            _ => ContainerStatus::Unknown,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, ContainerStatus::Finished | ContainerStatus::Published)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, ContainerStatus::Error | ContainerStatus::Expired)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}
