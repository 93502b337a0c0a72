use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use db::models::SignalEnvelope;
use geowatch_core::ingest::parse_message;
use geowatch_core::token::validate_name;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{ApiResult, AppError},
    routes::parse_token,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/signal/send/{token}/{mailbox}", post(send))
        .route("/api/signal/poll/{token}/{mailbox}", get(poll))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct SendResponse {
    ok: bool,
    queued: usize,
}

#[derive(Debug, Serialize)]
struct PollResponse {
    ok: bool,
    messages: Vec<SignalEnvelope>,
}

fn check_mailbox(mailbox: &str, request_id: &RequestId) -> ApiResult<()> {
    validate_name(mailbox).map_err(|err| {
        AppError::InvalidMailbox(format!("mailbox: {err}")).with_request_id(&request_id.0)
    })
}

async fn send(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((token, mailbox)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<SendResponse>> {
    let token = parse_token(&token, &request_id)?;
    check_mailbox(&mailbox, &request_id)?;
    let message = parse_message(&body).map_err(|err| {
        AppError::InvalidSignal(err.to_string()).with_request_id(&request_id.0)
    })?;

    let queued = db::queries::signals::send(&state.store, &token, &mailbox, message).await;
    debug!(token = %token, mailbox = %mailbox, queued, "signal: queued");

    Ok(Json(SendResponse { ok: true, queued }))
}

async fn poll(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((token, mailbox)): Path<(String, String)>,
) -> ApiResult<Json<PollResponse>> {
    let token = parse_token(&token, &request_id)?;
    check_mailbox(&mailbox, &request_id)?;

    let messages = db::queries::signals::poll(&state.store, &token, &mailbox).await;
    Ok(Json(PollResponse { ok: true, messages }))
}
