// apps/a4s-core/src/error.rs
// Purpose: Central error type for the control plane, mapped to HTTP status
// codes at the Axum boundary.
// Architecture: Cross-cutting
// Dependencies: thiserror, axum

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("agent not registered: {0}")]
    AgentNotRegistered(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("failed to spawn agent: {0}")]
    SpawnError(String),

    #[error("registry connection error: {0}")]
    RegistryConnectionError(String),

    #[error("registry error: {0}")]
    RegistryError(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("missing requester id")]
    MissingRequesterId,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::AgentNotRegistered(_) => StatusCode::NOT_FOUND,
            AppError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ChannelNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ImageNotFound(_) => StatusCode::BAD_REQUEST,
            AppError::SpawnError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RegistryConnectionError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RegistryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::MissingRequesterId => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(ErrorBody {
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
