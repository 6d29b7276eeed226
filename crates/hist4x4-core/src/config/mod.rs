//! Configuration for the predictor service
//!
//! Configuration is loaded once at process start (YAML file and/or environment),
//! validated, and then shared read-only with the predictor and the web layer.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;
