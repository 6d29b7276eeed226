//! Draw-code extraction from pasted history.
//!
//! Each line of input is expected to end with a 5-digit draw code, optionally
//! followed by non-digit noise (`251019-0750 17806`, `17806  `). Lines without
//! such a run are skipped; order is preserved as given.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::errors::PredictError;

/// Number of most recent draws the predictor reasons over.
pub const WINDOW_SIZE: usize = 16;

/// Minimum number of extracted draws a prediction needs.
pub const fn min_required_draws() -> usize {
    WINDOW_SIZE + 1
}

// ASCII-only classes: `\d` would also match other Unicode digits.
static TRAILING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{5})[^0-9]*$").expect("static draw pattern"));

/// A single historical draw: exactly five ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DrawCode(String);

impl DrawCode {
    pub fn parse(raw: &str) -> Result<Self, PredictError> {
        if raw.len() == 5 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(DrawCode(raw.to_string()))
        } else {
            Err(PredictError::ParsingError(format!(
                "'{}' is not a 5-digit draw code",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DrawCode {
    type Error = PredictError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DrawCode::parse(&value)
    }
}

impl From<DrawCode> for String {
    fn from(code: DrawCode) -> Self {
        code.0
    }
}

/// Extracts one draw code per line, in input order.
pub fn extract_draws(raw_text: &str) -> Vec<DrawCode> {
    raw_text
        .trim()
        .lines()
        .filter_map(|line| {
            TRAILING_CODE
                .captures(line.trim())
                .and_then(|caps| caps.get(1))
                .map(|m| DrawCode(m.as_str().to_string()))
        })
        .collect()
}

/// Extracts draws and rejects input with fewer than [`min_required_draws`] codes.
pub fn extract_sufficient_draws(raw_text: &str) -> Result<Vec<DrawCode>, PredictError> {
    let draws = extract_draws(raw_text);
    let required = min_required_draws();
    if draws.len() < required {
        return Err(PredictError::InsufficientData {
            found: draws.len(),
            required,
        });
    }
    Ok(draws)
}
