use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use tracing::error;

use crate::{
    error::{ApiResult, AppError},
    state::{AppState, RequestId},
    uploads::content_type_for,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/uploads/{filename}", get(serve_photo))
        .with_state(state)
}

async fn serve_photo(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let bytes = state
        .photos
        .read(&filename)
        .await
        .map_err(|err| {
            error!(request_id = %request_id.0, error = %err, "uploads: read failed");
            AppError::Internal.with_request_id(&request_id.0)
        })?
        .ok_or_else(|| {
            AppError::NotFound("no such photo".to_string()).with_request_id(&request_id.0)
        })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}
