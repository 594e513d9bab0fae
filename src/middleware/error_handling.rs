// ============================================================================
// Error Handling - Structured Failure Envelopes
// ============================================================================
//
// Every messaging operation answers with an explicit envelope:
//
//   { "success": false, "error": "<message>", "status": <http status> }
//
// 1. **Validation / not found**
//    - Empty body, self-messaging, same-role messaging, unknown counterparty
//    - Developer-controlled message returned as-is, no state change
//
// 2. **Store errors**
//    - Connectivity and constraint failures are logged server-side with full
//      detail and answered with a generic message
//    - Clients treat them as a skipped cycle, never as fatal
//
// ============================================================================

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] JsonRejection),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Jwt(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Client-safe message; store and internal details never leave the server
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Message store unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidInput(errors) => errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "Validation failed".to_string()),
            AppError::Json(_) => "Invalid JSON".to_string(),
            AppError::Jwt(_) => "Invalid token".to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(err) => tracing::error!("Message store error: {:?}", err),
            AppError::Internal(err) => tracing::error!("Internal error: {:?}", err),
            AppError::Jwt(err) => tracing::warn!("JWT error: {:?}", err),
            other => tracing::debug!("Request rejected: {}", other),
        }

        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_validation_error_envelope() {
        let response = AppError::Validation(EMPTY_MESSAGE_ERROR.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], EMPTY_MESSAGE_ERROR);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_store_error_is_not_leaked() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Message store unavailable");
    }
}
