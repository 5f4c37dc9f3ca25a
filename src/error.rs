use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ors::ProviderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Routing provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No route found: {0}")]
    NoRouteFound(String),

    #[error("No avoidable path: {0}")]
    NoAvoidablePath(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Provider(ProviderError::RateLimited(ref e)) => {
                tracing::warn!("Routing provider rate limited: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Routing provider is rate limiting requests".to_string(),
                )
            }
            AppError::Provider(ProviderError::RequestFailed(ref e)) => {
                tracing::error!("Routing provider request failed: {}", e);
                (StatusCode::BAD_GATEWAY, "Routing service error".to_string())
            }
            AppError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e),
            AppError::NoRouteFound(ref e) => {
                tracing::warn!("No route found: {}", e);
                (StatusCode::NOT_FOUND, e.clone())
            }
            AppError::NoAvoidablePath(ref e) => {
                tracing::warn!("No avoidable path: {}", e);
                (StatusCode::BAD_REQUEST, e.clone())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
