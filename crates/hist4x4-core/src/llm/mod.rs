//! Language model integration for next-draw prediction.
//!
//! [`client::ResponsesClient`] speaks the Responses API over HTTP,
//! [`classifier`] maps upstream failures to typed outcomes, and
//! [`adaptive::AdaptivePredictor`] walks the fallback ladder between them.

use async_trait::async_trait;

use crate::draws::DrawCode;
use crate::errors::PredictError;
use crate::prediction::PredictionResult;

pub mod adaptive;
pub mod classifier;
pub mod client;
pub mod request;
pub mod response_parser;

pub use adaptive::AdaptivePredictor;
pub use classifier::{classify, Outcome};
pub use client::ResponsesClient;
pub use request::{OutputMode, PredictionRequest};

/// Anything that can turn draw history into a prediction.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, draws: &[DrawCode]) -> Result<PredictionResult, PredictError>;
}
