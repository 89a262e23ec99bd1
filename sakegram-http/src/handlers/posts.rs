use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    Json,
};
use sakegram::{parse_schedule_time, NewPost, Post, PostStatus, SakegramError};
use sakegram_media::CloudinaryClient;
use std::sync::Arc;

use super::upload::{save_upload, UploadForm};
use super::AppState;
use crate::dto::{RetryResponse, ScheduleResponse, SuccessResponse};

/// Schedule an image post
///
/// Multipart fields: `image` (file), `caption`, `scheduleTime`. When
/// Cloudinary is configured the image is hosted there and the local copy
/// removed; otherwise the post keeps its `uploads/` path.
#[utoipa::path(
    post,
    path = "/api/schedule",
    tag = "posts",
    request_body(content = serde_json::Value, content_type = "multipart/form-data", description = "image, caption, scheduleTime"),
    responses(
        (status = 200, description = "Post scheduled", body = ScheduleResponse),
        (status = 400, description = "Missing image or invalid scheduleTime"),
        (status = 500, description = "Image upload to Cloudinary failed")
    ),
    security(("auth_token" = []))
)]
pub async fn schedule_post(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ScheduleResponse>, SakegramError> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_image()?;
    let schedule_time = parse_schedule_time(form.field("scheduleTime").unwrap_or_default())?;
    let caption = form.field("caption").unwrap_or_default().to_string();

    let saved = save_upload(&state.uploads_dir, &image).await?;

    let image_path = match state.settings.snapshot().cloudinary() {
        Some(credentials) => {
            let client = CloudinaryClient::new(
                credentials,
                state.media.cloudinary.clone(),
                state.http_client.clone(),
            );
            match client.upload(image.bytes, &image.file_name).await {
                Ok(url) => {
                    if let Err(e) = tokio::fs::remove_file(&saved.path).await {
                        tracing::warn!("Could not remove {}: {}", saved.path.display(), e);
                    }
                    url
                }
                Err(e) => {
                    tracing::error!("Cloudinary upload failed: {}", e);
                    return Err(SakegramError::Upload(
                        "Image upload to Cloudinary failed".into(),
                    ));
                }
            }
        }
        None => saved.relative,
    };

    let post = state.store.insert(NewPost {
        image_path,
        caption,
        schedule_time,
    })?;
    state.store.prune(state.post_limit)?;
    tracing::info!("Scheduled post {} for {}", post.id, post.schedule_time);

    Ok(Json(ScheduleResponse {
        message: "Post scheduled successfully!".into(),
        post,
    }))
}

/// All posts in the order they were scheduled
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    responses(
        (status = 200, description = "Posts", body = Vec<Post>)
    ),
    security(("auth_token" = []))
)]
pub async fn list_posts(State(state): State<Arc<AppState>>) -> Json<Vec<Post>> {
    Json(state.store.list())
}

/// Publish a post now, whatever its schedule
#[utoipa::path(
    post,
    path = "/api/posts/{id}/retry",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Attempt finished; `success` tells whether it was published", body = RetryResponse),
        (status = 400, description = "Post id is not a number"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post is already published")
    ),
    security(("auth_token" = []))
)]
pub async fn retry_post(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<RetryResponse>, SakegramError> {
    let id = post_id(id)?;
    let post = state.dispatcher.retry(id).await?;
    Ok(Json(RetryResponse {
        success: post.status == PostStatus::Posted,
        status: post.status,
        error: post.error,
    }))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 400, description = "Post id is not a number"),
        (status = 404, description = "Post not found")
    ),
    security(("auth_token" = []))
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse>, SakegramError> {
    let id = post_id(id)?;
    if !state.store.remove(id)? {
        return Err(SakegramError::PostNotFound(id));
    }
    tracing::info!("Deleted post {}", id);
    Ok(Json(SuccessResponse { success: true }))
}

/// Post ids are numeric; anything else is answered in the API's error shape.
fn post_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, SakegramError> {
    id.map(|Path(id)| id)
        .map_err(|e| SakegramError::InvalidRequest(format!("invalid post id: {}", e.body_text())))
}
