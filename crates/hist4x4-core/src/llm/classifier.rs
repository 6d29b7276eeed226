//! Classification of upstream failures for the fallback ladder.
//!
//! The Responses API reports capability gaps only through error wording, so all
//! marker strings live here and nowhere else.

use crate::errors::PredictError;

/// Name of the sampling parameter some models reject.
pub const TEMPERATURE_PARAM: &str = "temperature";

/// Any of these next to [`TEMPERATURE_PARAM`] means the parameter was refused.
pub const PARAMETER_REJECTION_MARKERS: [&str; 3] = [
    "Unsupported parameter",
    "unsupported_parameter",
    "invalid_request_error",
];

/// Any of these means the strict schema output mode was refused.
// "not supported" also matches refusals unrelated to the output format.
pub const SCHEMA_REJECTION_MARKERS: [&str; 3] = ["json_schema", "text.format", "not supported"];

/// Outcome of one outbound attempt, as far as the ladder is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    UnsupportedParameter,
    UnsupportedSchema,
    Other,
}

pub fn classify<T>(result: &Result<T, PredictError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Ok,
        Err(err) if rejects_temperature(err) => Outcome::UnsupportedParameter,
        Err(err) if rejects_strict_schema(err) => Outcome::UnsupportedSchema,
        Err(_) => Outcome::Other,
    }
}

/// A 4xx reply refusing the temperature parameter.
pub fn rejects_temperature(err: &PredictError) -> bool {
    match err {
        PredictError::UpstreamError { status, body } => {
            (400..500).contains(status)
                && body.contains(TEMPERATURE_PARAM)
                && PARAMETER_REJECTION_MARKERS.iter().any(|m| body.contains(m))
        }
        _ => false,
    }
}

/// An upstream reply refusing `json_schema` output.
pub fn rejects_strict_schema(err: &PredictError) -> bool {
    match err {
        PredictError::UpstreamError { body, .. } => {
            SCHEMA_REJECTION_MARKERS.iter().any(|m| body.contains(m))
        }
        _ => false,
    }
}
