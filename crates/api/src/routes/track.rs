use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use db::models::LocationInput;
use geowatch_core::ingest::{resolve_location, GpsFix};
use serde::Serialize;
use tracing::info;

use crate::{
    error::{ApiResult, AppError},
    extract::ClientContext,
    routes::parse_token,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/track/{token}", post(track))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct TrackResponse {
    ok: bool,
    id: String,
}

async fn track(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    client: ClientContext,
    Path(token): Path<String>,
    body: Bytes,
) -> ApiResult<Json<TrackResponse>> {
    let token = parse_token(&token, &request_id)?;
    let fix = GpsFix::from_body(&body).map_err(|err| {
        AppError::InvalidPayload(err.to_string()).with_request_id(&request_id.0)
    })?;

    let resolved = resolve_location(
        fix,
        &client.ip,
        state.geolocator.as_ref(),
        state.geocoder.as_ref(),
    )
    .await;

    let hit = db::queries::hits::record_location(
        &state.store,
        &token,
        LocationInput {
            ip: client.ip,
            ua: client.ua,
            coords: resolved.coords,
            ip_label: resolved.ip_label,
            place: resolved.place,
        },
    )
    .await;

    info!(
        request_id = %request_id.0,
        token = %token,
        hit_id = %hit.id,
        source = %hit.coords.source,
        "track: hit recorded"
    );

    Ok(Json(TrackResponse {
        ok: true,
        id: hit.id,
    }))
}
