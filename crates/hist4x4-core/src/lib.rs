//! Core library for the hist4x4 next-draw predictor.
//!
//! The crate turns pasted draw history into a prompt, sends it to an
//! OpenAI-compatible Responses endpoint and parses the model's verdict on
//! whether the next draw's front four or back four digits repeat a digit.
//!
//! # Architecture Overview
//!
//! - **Draw parsing**: [`draws`] extracts validated 5-digit codes from free-form text
//! - **Prompt rendering**: [`prompt`] builds the system and user instructions
//! - **Model integration**: [`llm`] holds the HTTP client, the error classifier
//!   and the adaptive sender that degrades gracefully on unsupported parameters
//! - **Configuration**: [`config`] loads an immutable [`AppConfig`] once at start-up

pub mod config;
pub mod draws;
pub mod errors;
pub mod llm;
pub mod prediction;
pub mod prompt;

pub use config::{AppConfig, ConfigLoader};
pub use draws::{extract_draws, DrawCode};
pub use errors::PredictError;
pub use llm::{AdaptivePredictor, Predictor};
pub use prediction::{PredictionResult, Verdict};

#[cfg(test)]
pub mod test_utils;
