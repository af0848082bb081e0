use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use profchat_rag::ChatError;

/// A failed chat request, rendered as `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug)]
pub enum ApiError {
    Chat(ChatError),
    /// Every chat stream slot is taken.
    Overloaded,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    kind: &'a str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Chat(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Chat(err) => err.kind(),
            ApiError::Overloaded => "overloaded",
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Chat(err) => err.to_string(),
            ApiError::Overloaded => "too many chat streams in flight, retry later".to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
