use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SakegramError {
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An optional integration (OpenAI, remove.bg, ...) has no credentials.
    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Publish(String),

    #[error("{0}")]
    Media(String),

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SakegramError>;

impl From<std::io::Error> for SakegramError {
    fn from(e: std::io::Error) -> Self {
        SakegramError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SakegramError {
    fn from(e: serde_json::Error) -> Self {
        SakegramError::Json(e.to_string())
    }
}

impl From<image::ImageError> for SakegramError {
    fn from(e: image::ImageError) -> Self {
        SakegramError::Image(e.to_string())
    }
}

impl From<sakegram_graph::GraphError> for SakegramError {
    fn from(e: sakegram_graph::GraphError) -> Self {
        SakegramError::Publish(e.to_string())
    }
}

impl From<sakegram_media::MediaError> for SakegramError {
    fn from(e: sakegram_media::MediaError) -> Self {
        match e {
            sakegram_media::MediaError::NotConfigured(msg) => SakegramError::NotConfigured(msg),
            other => SakegramError::Media(other.to_string()),
        }
    }
}

impl SakegramError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SakegramError::PostNotFound(_) => StatusCode::NOT_FOUND,
            SakegramError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SakegramError::MissingField(_) => StatusCode::BAD_REQUEST,
            SakegramError::Unauthorized => StatusCode::UNAUTHORIZED,
            SakegramError::InvalidPassword => StatusCode::UNAUTHORIZED,
            SakegramError::Conflict(_) => StatusCode::CONFLICT,
            SakegramError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SakegramError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SakegramError::Publish(_) => StatusCode::BAD_GATEWAY,
            SakegramError::Media(_) => StatusCode::BAD_GATEWAY,
            SakegramError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SakegramError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SakegramError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SakegramError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

/// Error body. `error` carries the human readable message the front-end displays.
#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for SakegramError {
    fn into_response(self) -> Response {
        let (error_code, message, suggestion) = match &self {
            SakegramError::PostNotFound(_) => ("post_not_found", "Post not found".to_string(), None),
            SakegramError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            SakegramError::MissingField(field) => (
                "missing_field",
                format!("Required field '{}' is missing", field),
                None,
            ),
            SakegramError::Unauthorized => (
                "unauthorized",
                "Unauthorized".to_string(),
                Some("Log in with POST /api/login and send the token as x-auth-token".to_string()),
            ),
            SakegramError::InvalidPassword => {
                ("invalid_password", "Invalid password".to_string(), None)
            }
            SakegramError::Conflict(msg) => ("conflict", msg.clone(), None),
            SakegramError::NotConfigured(msg) => (
                "not_configured",
                msg.clone(),
                Some("Set the key in the settings screen (POST /api/config)".to_string()),
            ),
            SakegramError::Upload(msg) => ("upload_failed", msg.clone(), None),
            SakegramError::Publish(msg) => ("publish_failed", msg.clone(), None),
            SakegramError::Media(msg) => ("media_service_error", msg.clone(), None),
            SakegramError::Image(msg) => (
                "image_error",
                format!("Image processing error: {}", msg),
                Some("Upload a JPEG, PNG or WebP photo".to_string()),
            ),
            SakegramError::Io(e) => ("io_error", format!("IO error: {}", e), None),
            SakegramError::Json(e) => ("json_error", format!("JSON error: {}", e), None),
            SakegramError::Config(e) => (
                "config_error",
                format!("Configuration error: {}", e),
                None,
            ),
        };

        let error_response = ErrorResponse {
            error: message,
            code: error_code.to_string(),
            suggestion,
        };

        (self.status_code(), Json(error_response)).into_response()
    }
}
