//! Error types for the prediction pipeline
//!
//! Every failure a prediction can hit is one variant of [`PredictError`]. Upstream
//! replies keep their status code and (truncated) body so the fallback ladder can
//! classify them without re-parsing strings scattered through the call path.

use thiserror::Error;

/// Upper bound on how much of an upstream error body is kept.
pub const MAX_ERROR_BODY_CHARS: usize = 400;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("insufficient data: found {found} valid lines, at least {required} required")]
    InsufficientData { found: usize, required: usize },
    #[error("OpenAI API error {status}: {body}")]
    UpstreamError { status: u16, body: String },
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP request failed: {0}")]
    TransportError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PredictError {
    /// Builds an upstream error, keeping at most [`MAX_ERROR_BODY_CHARS`] of the body.
    pub fn upstream(status: u16, body: &str) -> Self {
        PredictError::UpstreamError {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    /// True for errors caused by the caller's input rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::InsufficientData { .. })
    }
}

impl From<reqwest::Error> for PredictError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PredictError::Timeout(err.to_string())
        } else {
            PredictError::TransportError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PredictError {
    fn from(err: serde_json::Error) -> Self {
        PredictError::ParsingError(err.to_string())
    }
}
