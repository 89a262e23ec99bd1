use axum::{extract::State, http::HeaderMap, Json};
use sakegram::SakegramError;
use std::sync::Arc;

use super::AppState;
use crate::auth::AUTH_HEADER;
use crate::dto::{AuthStatusResponse, LoginRequest, LoginResponse};

/// Exchange the app password for a session token
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid password")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, SakegramError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let settings = state.settings.snapshot();
    let token = state
        .auth
        .login(settings.app_password.as_deref(), body.password.as_deref())?;

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

/// Whether a password is required and whether the caller's token is valid
#[utoipa::path(
    get,
    path = "/api/auth-status",
    tag = "session",
    responses(
        (status = 200, description = "Session state", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse> {
    let settings = state.settings.snapshot();
    let password = settings.app_password.as_deref();
    let presented = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());

    Json(AuthStatusResponse {
        auth_required: password.is_some(),
        authenticated: state.auth.is_authenticated(password, presented),
    })
}
