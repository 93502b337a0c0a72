use axum::{
    body::Bytes,
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use geowatch_core::ingest::parse_object;
use geowatch_core::token::ChannelToken;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ApiResult, AppError},
    routes::parse_token,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/channels", get(list_channels).post(create_channel))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct CreateChannelRequest {
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateChannelResponse {
    ok: bool,
    token: String,
    created_at: String,
    created: bool,
    share_path: String,
}

#[derive(Debug, Serialize)]
struct ChannelListResponse {
    ok: bool,
    channels: Vec<ChannelListItem>,
}

#[derive(Debug, Serialize)]
struct ChannelListItem {
    token: String,
    created_at: String,
    hit_count: usize,
    session_count: usize,
    last_hit_at: Option<String>,
    share_path: String,
    admin_path: String,
}

fn share_path(token: &str) -> String {
    format!("/t/{token}")
}

fn admin_path(token: &str) -> String {
    format!("/admin/{token}")
}

async fn list_channels(State(state): State<AppState>) -> Json<ChannelListResponse> {
    let channels = db::queries::channels::list(&state.store)
        .await
        .into_iter()
        .map(|summary| ChannelListItem {
            share_path: share_path(&summary.token),
            admin_path: admin_path(&summary.token),
            token: summary.token,
            created_at: summary.created_at,
            hit_count: summary.hit_count,
            session_count: summary.session_count,
            last_hit_at: summary.last_hit_at,
        })
        .collect();

    Json(ChannelListResponse { ok: true, channels })
}

/// Get-or-create. A missing or blank slug yields a generated token.
async fn create_channel(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<Json<CreateChannelResponse>> {
    let payload: CreateChannelRequest = parse_object(&body).map_err(|err| {
        AppError::InvalidPayload(err.to_string()).with_request_id(&request_id.0)
    })?;

    let token = match payload.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => parse_token(slug, &request_id)?,
        _ => ChannelToken::generate(),
    };

    let channel = db::queries::channels::get_or_create(&state.store, &token).await;
    if channel.created {
        info!(request_id = %request_id.0, token = %token, "admin: channel created");
    }

    Ok(Json(CreateChannelResponse {
        ok: true,
        share_path: share_path(&channel.token),
        token: channel.token,
        created_at: channel.created_at,
        created: channel.created,
    }))
}
