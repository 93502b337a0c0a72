use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use db::models::{Hit, Session};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::ApiResult,
    routes::parse_token,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/locations/{token}", get(list_locations))
        .route("/api/clear/{token}", post(clear_locations))
        .route("/api/sessions/{token}", get(list_sessions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SinceQuery {
    since: Option<String>,
}

#[derive(Debug, Serialize)]
struct LocationsResponse {
    ok: bool,
    hits: Vec<Hit>,
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    ok: bool,
    cleared: usize,
}

#[derive(Debug, Serialize)]
struct SessionsResponse {
    ok: bool,
    sessions: Vec<Session>,
}

async fn list_locations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(token): Path<String>,
    Query(query): Query<SinceQuery>,
) -> ApiResult<Json<LocationsResponse>> {
    let token = parse_token(&token, &request_id)?;
    let since = query.since.filter(|since| !since.is_empty());

    let hits = db::queries::hits::list_since(&state.store, &token, since.as_deref()).await;
    let cursor = hits.last().map(|hit| hit.ts.clone()).or(since);

    Ok(Json(LocationsResponse {
        ok: true,
        hits,
        cursor,
    }))
}

async fn clear_locations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(token): Path<String>,
) -> ApiResult<Json<ClearResponse>> {
    let token = parse_token(&token, &request_id)?;
    let cleared = db::queries::hits::clear(&state.store, &token).await;
    info!(request_id = %request_id.0, token = %token, cleared, "admin: hit log cleared");
    Ok(Json(ClearResponse { ok: true, cleared }))
}

async fn list_sessions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(token): Path<String>,
) -> ApiResult<Json<SessionsResponse>> {
    let token = parse_token(&token, &request_id)?;
    let sessions = db::queries::sessions::list(&state.store, &token).await;
    Ok(Json(SessionsResponse {
        ok: true,
        sessions,
    }))
}
