//! The model's verdict for the next draw.

use serde::{Deserialize, Serialize};

use crate::errors::PredictError;

/// Whether a four-digit window contains a repeated digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "重复", alias = "重号", alias = "duplicate")]
    Duplicate,
    #[serde(rename = "不重", alias = "no_duplicate")]
    NoDuplicate,
}

impl Verdict {
    pub fn is_duplicate(self) -> bool {
        matches!(self, Verdict::Duplicate)
    }
}

/// Parsed reply from the model. Confidence and tau distances are passed
/// through as reported; the strict output schema bounds them upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub front: Verdict,
    pub back: Verdict,
    pub front_confidence: f64,
    pub back_confidence: f64,
    pub front_tau_distance: f64,
    pub back_tau_distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PredictionResult {
    /// Parses the model's JSON text. Any missing required field is an error.
    pub fn from_model_text(text: &str) -> Result<Self, PredictError> {
        serde_json::from_str(text.trim()).map_err(|e| {
            PredictError::ParsingError(format!("model reply is not a valid prediction: {}", e))
        })
    }
}
