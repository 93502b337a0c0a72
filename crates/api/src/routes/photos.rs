use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use geowatch_core::token::validate_name;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    error::{ApiError, ApiResult, AppError},
    extract::ClientContext,
    routes::parse_token,
    state::{AppState, RequestId},
};

const PHOTO_FIELD: &str = "photo";

pub fn router(state: AppState) -> Router {
    let limit = state.settings.max_photo_bytes;
    Router::new()
        .route(
            "/api/photo/{token}/{hit_id}",
            post(upload_photo).layer(DefaultBodyLimit::max(limit)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct PhotoResponse {
    ok: bool,
    id: String,
    photo_url: String,
}

struct Upload {
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn upload_photo(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    client: ClientContext,
    Path((token, hit_id)): Path<(String, String)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PhotoResponse>> {
    let token = parse_token(&token, &request_id)?;
    validate_name(&hit_id).map_err(|err| {
        AppError::InvalidPayload(format!("hit id: {err}")).with_request_id(&request_id.0)
    })?;

    let multipart = multipart.map_err(|rejection| {
        AppError::InvalidPayload(rejection.body_text()).with_request_id(&request_id.0)
    })?;
    let upload = read_photo(multipart)
        .await
        .map_err(|err| multipart_error(err, &request_id))?
        .ok_or_else(|| AppError::MissingFile.with_request_id(&request_id.0))?;

    let filename = state
        .photos
        .save(&token, &hit_id, upload.content_type.as_deref(), &upload.bytes)
        .await
        .map_err(|err| {
            error!(request_id = %request_id.0, error = %err, "photo: failed to write file");
            AppError::Internal.with_request_id(&request_id.0)
        })?;
    let photo_url = format!("/uploads/{filename}");

    let hit = db::queries::hits::attach_photo(
        &state.store,
        &token,
        &hit_id,
        client.ip,
        client.ua,
        photo_url.clone(),
    )
    .await;

    info!(
        request_id = %request_id.0,
        token = %token,
        hit_id = %hit.id,
        parent_id = hit.parent_id.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        "photo: stored"
    );

    Ok(Json(PhotoResponse {
        ok: true,
        id: hit.id,
        photo_url,
    }))
}

/// First non-empty part named `photo`; other parts are skipped.
async fn read_photo(mut multipart: Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if !bytes.is_empty() {
            return Ok(Some(Upload {
                content_type,
                bytes: bytes.to_vec(),
            }));
        }
    }
    Ok(None)
}

fn multipart_error(err: MultipartError, request_id: &RequestId) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge.with_request_id(&request_id.0)
    } else {
        AppError::InvalidPayload(err.body_text()).with_request_id(&request_id.0)
    }
}
