use axum::{extract::State, Json};
use sakegram::{SakegramError, SettingsUpdate, SettingsView};
use std::sync::Arc;

use super::AppState;
use crate::dto::MessageResponse;

/// Current integration settings
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    responses(
        (status = 200, description = "Settings", body = SettingsView)
    ),
    security(("auth_token" = []))
)]
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SettingsView> {
    Json(state.settings.snapshot().view())
}

/// Update integration settings; absent fields are left as they are
#[utoipa::path(
    post,
    path = "/api/config",
    tag = "config",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Settings saved", body = MessageResponse)
    ),
    security(("auth_token" = []))
)]
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<MessageResponse>, SakegramError> {
    state.settings.update(&update)?;
    Ok(Json(MessageResponse {
        message: "Settings updated".into(),
    }))
}
