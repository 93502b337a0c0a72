use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug)]
pub enum AppError {
    InvalidPayload(String),
    InvalidToken(String),
    InvalidMailbox(String),
    InvalidSignal(String),
    MissingFile,
    MissingSessionId,
    PayloadTooLarge,
    Unauthorized,
    NotFound(String),
    Internal,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: String,
}

impl AppError {
    pub fn with_request_id(self, request_id: &str) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.to_string(),
        }
    }
}

const BASIC_CHALLENGE: &str = "Basic realm=\"geowatch\"";

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self.error {
            AppError::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, "invalid_payload", msg),
            AppError::InvalidToken(msg) => (StatusCode::BAD_REQUEST, "invalid_token", msg),
            AppError::InvalidMailbox(msg) => (StatusCode::BAD_REQUEST, "invalid_mailbox", msg),
            AppError::InvalidSignal(msg) => (StatusCode::BAD_REQUEST, "invalid_signal", msg),
            AppError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "missing_file",
                "multipart field \"photo\" is required".to_string(),
            ),
            AppError::MissingSessionId => (
                StatusCode::BAD_REQUEST,
                "missing_session_id",
                "session_id is required".to_string(),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "upload exceeds the size limit".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Admin credentials required".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Unexpected error".to_string(),
            ),
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                ok: false,
                error: code,
                message,
                request_id: self.request_id,
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
