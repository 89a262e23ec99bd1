use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use sakegram::SakegramError;
use std::sync::Arc;

use crate::auth::AUTH_HEADER;
use crate::handlers::AppState;

/// Reject requests without the current session token. The password is read
/// from the live settings so a change applies to the next request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, SakegramError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let settings = state.settings.snapshot();
    let presented = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());

    if !state
        .auth
        .is_authenticated(settings.app_password.as_deref(), presented)
    {
        tracing::debug!("Rejected {} {}", request.method(), request.uri().path());
        return Err(SakegramError::Unauthorized);
    }

    Ok(next.run(request).await)
}
