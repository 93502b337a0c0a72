use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use geowatch_core::auth::{parse_basic, verify_credentials};
use tracing::warn;

use crate::{
    error::{ApiError, AppError},
    state::{AppState, RequestId},
};

/// HTTP Basic guard for the admin surface. With no admin password
/// configured every request is refused.
pub async fn admin_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let Some(password) = state.settings.admin_password.as_deref() else {
        warn!(request_id = %request_id, "admin: no password configured, refusing");
        return Err(AppError::Unauthorized.with_request_id(&request_id));
    };

    let credentials = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic)
        .ok_or_else(|| AppError::Unauthorized.with_request_id(&request_id))?;

    if !verify_credentials(&credentials, &state.settings.admin_user, password) {
        warn!(
            request_id = %request_id,
            username = %credentials.username,
            "admin: credentials rejected"
        );
        return Err(AppError::Unauthorized.with_request_id(&request_id));
    }

    Ok(next.run(req).await)
}
