use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use db::models::DeviceInfo;
use db::queries::sessions::Presence;
use geowatch_core::ingest::parse_object;
use geowatch_core::token::validate_name;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ApiResult, AppError},
    extract::ClientContext,
    routes::parse_token,
    state::{AppState, RequestId},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session/start/{token}", post(start))
        .route("/api/session/heartbeat/{token}", post(heartbeat))
        .route("/api/session/stop/{token}", post(stop))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct SessionRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(flatten)]
    device: DeviceInfo,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    ok: bool,
    session_id: String,
}

impl SessionRequest {
    fn parse(body: &[u8], request_id: &RequestId) -> ApiResult<Self> {
        let request: SessionRequest = parse_object(body).map_err(|err| {
            AppError::InvalidPayload(err.to_string()).with_request_id(&request_id.0)
        })?;
        if let Some(id) = request.session_id.as_deref().filter(|id| !id.is_empty()) {
            validate_name(id).map_err(|err| {
                AppError::InvalidPayload(format!("session_id: {err}"))
                    .with_request_id(&request_id.0)
            })?;
        }
        Ok(request)
    }

    /// The client-supplied id, if any and non-empty.
    fn id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }

    fn require_id(&self, request_id: &RequestId) -> ApiResult<String> {
        self.id()
            .map(str::to_string)
            .ok_or_else(|| AppError::MissingSessionId.with_request_id(&request_id.0))
    }
}

async fn start(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    client: ClientContext,
    Path(token): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SessionResponse>> {
    let token = parse_token(&token, &request_id)?;
    let request = SessionRequest::parse(&body, &request_id)?;
    let requested = request.id().map(str::to_string);

    let session_id = db::queries::sessions::start(
        &state.store,
        &token,
        requested,
        Presence {
            ip: client.ip,
            ua: client.ua,
            device: request.device,
        },
    )
    .await;

    info!(request_id = %request_id.0, token = %token, session_id = %session_id, "session: started");
    Ok(Json(SessionResponse {
        ok: true,
        session_id,
    }))
}

async fn heartbeat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    client: ClientContext,
    Path(token): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SessionResponse>> {
    let token = parse_token(&token, &request_id)?;
    let request = SessionRequest::parse(&body, &request_id)?;
    let session_id = request.require_id(&request_id)?;

    db::queries::sessions::heartbeat(
        &state.store,
        &token,
        &session_id,
        Presence {
            ip: client.ip,
            ua: client.ua,
            device: request.device,
        },
    )
    .await;

    Ok(Json(SessionResponse {
        ok: true,
        session_id,
    }))
}

async fn stop(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(token): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SessionResponse>> {
    let token = parse_token(&token, &request_id)?;
    let request = SessionRequest::parse(&body, &request_id)?;
    let session_id = request.require_id(&request_id)?;

    let known = db::queries::sessions::stop(&state.store, &token, &session_id).await;
    info!(request_id = %request_id.0, token = %token, session_id = %session_id, known, "session: stopped");

    Ok(Json(SessionResponse {
        ok: true,
        session_id,
    }))
}
