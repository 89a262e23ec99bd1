//! AI-assisted image preparation: brand analysis, generated backdrops,
//! clean studio backdrops and label cut-outs.

use axum::{
    extract::{Multipart, State},
    Json,
};
use sakegram::studio::{self, CleanParams, LabelParams, OutputKind, RgbaImage};
use sakegram::SakegramError;
use sakegram_media::{OpenAiClient, RemoveBgClient};
use std::sync::Arc;

use super::upload::{relative_path, save_upload, UploadForm, UploadedFile};
use super::AppState;
use crate::dto::{BrandAnalysisResponse, GeneratedImageResponse};

impl AppState {
    fn openai(&self) -> Result<OpenAiClient, SakegramError> {
        let settings = self.settings.snapshot();
        Ok(OpenAiClient::new(
            settings.openai_api_key.as_deref(),
            self.media.openai.clone(),
            self.http_client.clone(),
        )?)
    }

    fn remove_bg(&self) -> Result<RemoveBgClient, SakegramError> {
        let settings = self.settings.snapshot();
        Ok(RemoveBgClient::new(
            settings.remove_bg_api_key.as_deref(),
            self.media.remove_bg.clone(),
            self.http_client.clone(),
        )?)
    }

    /// Cut the subject out of an uploaded photo.
    async fn cut_out(&self, image: &UploadedFile) -> Result<Vec<u8>, SakegramError> {
        let client = self.remove_bg()?;
        Ok(client
            .remove_background(image.bytes.clone(), &image.file_name)
            .await?)
    }
}

/// Run a composite off the async runtime and write it as `{stem}_{kind}.png`.
async fn render<F>(
    state: &AppState,
    stem: &str,
    kind: OutputKind,
    compose: F,
) -> Result<GeneratedImageResponse, SakegramError>
where
    F: FnOnce() -> Result<RgbaImage, SakegramError> + Send + 'static,
{
    let dir = state.uploads_dir.clone();
    let file_name = kind.file_name(stem);
    let target = file_name.clone();

    tokio::task::spawn_blocking(move || {
        let img = compose()?;
        studio::save_png(&dir, &target, &img)
    })
    .await
    .map_err(|e| SakegramError::Image(format!("compositing task failed: {}", e)))??;

    Ok(GeneratedImageResponse {
        success: true,
        generated_image_path: relative_path(&file_name),
    })
}

/// Identify the sake brand on a bottle photo
#[utoipa::path(
    post,
    path = "/api/analyze-sake",
    tag = "studio",
    request_body(content = serde_json::Value, content_type = "multipart/form-data", description = "image"),
    responses(
        (status = 200, description = "Brand and suggested background prompt", body = BrandAnalysisResponse),
        (status = 500, description = "OpenAI API Key not configured"),
        (status = 502, description = "Image analysis failed")
    ),
    security(("auth_token" = []))
)]
pub async fn analyze_sake(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BrandAnalysisResponse>, SakegramError> {
    let client = state.openai()?;
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;

    let analysis = client
        .analyze_label(&image.bytes, &image.mime())
        .await
        .map_err(|e| SakegramError::Media(format!("Image analysis failed: {}", e)))?;
    tracing::info!("[studio] Identified brand: {}", analysis.brand);
    Ok(Json(analysis.into()))
}

/// Generate a backdrop from a prompt and place the product on it
#[utoipa::path(
    post,
    path = "/api/generate-background",
    tag = "studio",
    request_body(content = serde_json::Value, content_type = "multipart/form-data", description = "image, prompt"),
    responses(
        (status = 200, description = "Composite written", body = GeneratedImageResponse),
        (status = 500, description = "OpenAI API Key not configured"),
        (status = 502, description = "Background generation failed")
    ),
    security(("auth_token" = []))
)]
pub async fn generate_background(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<GeneratedImageResponse>, SakegramError> {
    let client = state.openai()?;
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let prompt = form.field("prompt").unwrap_or_default().trim().to_string();
    let saved = save_upload(&state.uploads_dir, &image).await?;

    tracing::info!("[studio] Generating background with prompt: {}", prompt);
    let background = client
        .generate_background(&prompt)
        .await
        .map_err(|e| SakegramError::Media(format!("Background generation failed: {}", e)))?;

    let product = image.bytes;
    let response = render(&state, &saved.stem, OutputKind::Generated, move || {
        let background = studio::decode(&background)?;
        let product = studio::decode(&product)?;
        Ok(studio::compose_generated(&background, &product))
    })
    .await?;
    Ok(Json(response))
}

/// Remove the photo's background and place the bottle on a studio backdrop
#[utoipa::path(
    post,
    path = "/api/clean-background",
    tag = "studio",
    request_body(content = serde_json::Value, content_type = "multipart/form-data",
        description = "image, bgTone, brightness, shadow, subjectScale, offsetX, offsetY, shadowStrength"),
    responses(
        (status = 200, description = "Composite written", body = GeneratedImageResponse),
        (status = 500, description = "Remove.bg API Key not configured"),
        (status = 502, description = "remove.bg rejected the image")
    ),
    security(("auth_token" = []))
)]
pub async fn clean_background(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<GeneratedImageResponse>, SakegramError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let params = CleanParams::from_fields(&form.fields);
    let saved = save_upload(&state.uploads_dir, &image).await?;

    let cut_out = state.cut_out(&image).await?;
    let response = render(&state, &saved.stem, OutputKind::Clean, move || {
        let subject = studio::decode(&cut_out)?;
        Ok(studio::compose_clean(&subject, &params))
    })
    .await?;
    Ok(Json(response))
}

/// Export the bottle as a cut-out on a transparent or white canvas
#[utoipa::path(
    post,
    path = "/api/label-export",
    tag = "studio",
    request_body(content = serde_json::Value, content_type = "multipart/form-data",
        description = "image, width, height, margin, background"),
    responses(
        (status = 200, description = "Cut-out written", body = GeneratedImageResponse),
        (status = 500, description = "Remove.bg API Key not configured"),
        (status = 502, description = "remove.bg rejected the image")
    ),
    security(("auth_token" = []))
)]
pub async fn label_export(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<GeneratedImageResponse>, SakegramError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let params = LabelParams::from_fields(&form.fields);
    let saved = save_upload(&state.uploads_dir, &image).await?;

    let cut_out = state.cut_out(&image).await?;
    let response = render(&state, &saved.stem, OutputKind::Label, move || {
        let subject = studio::decode(&cut_out)?;
        Ok(studio::compose_label(&subject, &params))
    })
    .await?;
    Ok(Json(response))
}
