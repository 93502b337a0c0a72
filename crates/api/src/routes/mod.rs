pub mod channels;
pub mod export;
pub mod locations;
pub mod photos;
pub mod sessions;
pub mod signals;
pub mod track;
pub mod uploads;


use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use geowatch_core::token::ChannelToken;
use serde_json::{json, Value as JsonValue};

use crate::{
    error::{ApiResult, AppError},
    middleware::{auth::admin_auth, request_id::request_id},
    state::{AppState, RequestId},
};

/// Unauthenticated surface used by tracked clients.
pub fn public_router(state: AppState) -> Router {
    Router::new()
        .merge(track::router(state.clone()))
        .merge(photos::router(state.clone()))
        .merge(sessions::router(state.clone()))
        .merge(signals::router(state.clone()))
        .merge(uploads::router(state))
}

/// Operator surface; callers must wrap it in [`admin_auth`].
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .merge(locations::router(state.clone()))
        .merge(export::router(state.clone()))
        .merge(channels::router(state))
}

/// Liveness check.
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

pub fn app(state: AppState) -> Router {
    let admin =
        admin_router(state.clone()).route_layer(from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .merge(health_router())
        .merge(public_router(state))
        .merge(admin)
        .layer(from_fn(request_id))
}

pub(crate) fn parse_token(raw: &str, request_id: &RequestId) -> ApiResult<ChannelToken> {
    ChannelToken::parse(raw)
        .map_err(|err| AppError::InvalidToken(err.to_string()).with_request_id(&request_id.0))
}
