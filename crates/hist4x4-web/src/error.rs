//! Error types for the web front end.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hist4x4_core::PredictError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request body or parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Too few valid draw lines
    #[error("{0}")]
    InsufficientData(String),

    /// No identity in the session while login is required
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The predictor failed
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The identity provider failed
    #[error("Login provider error: {0}")]
    OAuth(String),

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) | ServerError::InsufficientData(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::OAuth(_) => StatusCode::BAD_GATEWAY,
            ServerError::Prediction(_)
            | ServerError::Config(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::InsufficientData(_) => "insufficient_data",
            ServerError::Unauthorized(_) => "unauthorized",
            ServerError::Prediction(_) => "prediction_error",
            ServerError::OAuth(_) => "oauth_error",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl From<PredictError> for ServerError {
    fn from(err: PredictError) -> Self {
        if err.is_client_error() {
            ServerError::InsufficientData(err.to_string())
        } else {
            ServerError::Prediction(err.to_string())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }
        (
            status,
            Json(json!({
                "error": self.error_type(),
                "detail": self.to_string(),
                "timestamp": chrono::Utc::now()
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_errors_map_to_status() {
        let insufficient: ServerError =
            PredictError::InsufficientData { found: 2, required: 17 }.into();
        assert_eq!(insufficient.status_code(), StatusCode::BAD_REQUEST);
        assert!(insufficient.to_string().contains("17"));

        let upstream: ServerError = PredictError::upstream(500, "boom").into();
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(upstream.to_string().contains("OpenAI API error 500: boom"));
    }
}
