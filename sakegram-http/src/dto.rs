use sakegram::Post;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub auth_required: bool,
    pub authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleResponse {
    pub message: String,
    pub post: Post,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryResponse {
    pub success: bool,
    pub status: sakegram::PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Result of every studio endpoint that writes an image.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageResponse {
    pub success: bool,
    /// Server-relative path, e.g. `uploads/1712_clean.png`.
    pub generated_image_path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrandAnalysisResponse {
    pub brand: String,
    pub background_prompt: String,
}

impl From<sakegram_media::BrandAnalysis> for BrandAnalysisResponse {
    fn from(a: sakegram_media::BrandAnalysis) -> Self {
        Self {
            brand: a.brand,
            background_prompt: a.background_prompt,
        }
    }
}
