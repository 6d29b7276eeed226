//! Request bodies for the Responses endpoint.

use serde_json::{json, Value};

use crate::draws::DrawCode;
use crate::prompt::{build_prompts, prompt_window, PromptPair};

pub const SCHEMA_NAME: &str = "Hist4x4Prediction";

/// How the model is asked to shape its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `json_schema` with `strict: true`.
    StrictSchema,
    /// Plain `json_object`; the prompt carries the field list instead.
    JsonObject,
}

/// One outbound prediction call. Built fresh per attempt and never mutated
/// after it is sent; fallbacks derive a new request instead.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub model: String,
    pub draws: Vec<DrawCode>,
    pub output_mode: OutputMode,
    pub temperature: Option<f64>,
}

impl PredictionRequest {
    /// The first rung: strict schema output with a sampling temperature.
    pub fn strict(model: &str, draws: &[DrawCode], temperature: f64) -> Self {
        Self {
            model: model.to_string(),
            draws: prompt_window(draws).to_vec(),
            output_mode: OutputMode::StrictSchema,
            temperature: Some(temperature),
        }
    }

    /// Same draws in `json_object` mode, with the temperature restored.
    pub fn loosened(&self, temperature: f64) -> Self {
        Self {
            output_mode: OutputMode::JsonObject,
            temperature: Some(temperature),
            ..self.clone()
        }
    }

    pub fn without_temperature(&self) -> Self {
        Self {
            temperature: None,
            ..self.clone()
        }
    }

    pub fn prompts(&self) -> PromptPair {
        let mut prompts = build_prompts(&self.draws);
        if self.output_mode == OutputMode::JsonObject {
            prompts.reinforce_json_only();
        }
        prompts
    }

    pub fn to_body(&self) -> Value {
        let prompts = self.prompts();
        let format = match self.output_mode {
            OutputMode::StrictSchema => json!({
                "type": "json_schema",
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": prediction_schema(),
            }),
            OutputMode::JsonObject => json!({ "type": "json_object" }),
        };

        let mut body = json!({
            "model": self.model,
            "input": [
                {
                    "role": "system",
                    "content": [{ "type": "input_text", "text": prompts.system }]
                },
                {
                    "role": "user",
                    "content": [{ "type": "input_text", "text": prompts.user }]
                }
            ],
            "text": { "format": format },
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = temperature.into();
        }

        body
    }
}

/// JSON schema for [`crate::prediction::PredictionResult`].
pub fn prediction_schema() -> Value {
    let verdict = json!({ "type": "string", "enum": ["重号", "不重", "重复"] });
    let unit = json!({ "type": "number", "minimum": 0, "maximum": 1 });
    json!({
        "type": "object",
        "properties": {
            "front": verdict,
            "back": verdict,
            "front_confidence": unit,
            "back_confidence": unit,
            "front_tau_distance": unit,
            "back_tau_distance": unit,
            "notes": { "type": "string" }
        },
        "required": [
            "front", "back", "front_confidence", "back_confidence",
            "front_tau_distance", "back_tau_distance"
        ],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{JSON_ONLY_REINFORCEMENT, PROMPT_HISTORY_LEN};

    fn draws(n: usize) -> Vec<DrawCode> {
        (0..n)
            .map(|i| DrawCode::parse(&format!("{:05}", i * 3)).unwrap())
            .collect()
    }

    #[test]
    fn test_strict_body_shape() {
        let body = PredictionRequest::strict("gpt-5-mini", &draws(20), 0.2).to_body();
        assert_eq!(body["model"], "gpt-5-mini");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["text"]["format"]["type"], "json_schema");
        assert_eq!(body["text"]["format"]["name"], SCHEMA_NAME);
        assert_eq!(body["text"]["format"]["strict"], true);
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][1]["role"], "user");
        assert_eq!(body["input"][1]["content"][0]["type"], "input_text");
        let user = body["input"][1]["content"][0]["text"].as_str().unwrap();
        assert!(user.contains("00057"));
        assert!(!user.contains(JSON_ONLY_REINFORCEMENT));
    }

    #[test]
    fn test_request_keeps_only_prompt_window() {
        let request = PredictionRequest::strict("m", &draws(200), 0.2);
        assert_eq!(request.draws.len(), PROMPT_HISTORY_LEN);
        assert_eq!(request.draws.last().unwrap().as_str(), "00597");
    }

    #[test]
    fn test_without_temperature_drops_field() {
        let body = PredictionRequest::strict("m", &draws(20), 0.2)
            .without_temperature()
            .to_body();
        assert!(body.get("temperature").is_none());
        assert_eq!(body["text"]["format"]["type"], "json_schema");
    }

    #[test]
    fn test_loosened_body_reinforces_once() {
        let strict = PredictionRequest::strict("m", &draws(20), 0.2).without_temperature();
        let loose = strict.loosened(0.2);
        let body = loose.to_body();
        assert_eq!(body["text"]["format"], json!({ "type": "json_object" }));
        assert_eq!(body["temperature"], 0.2);
        let user = body["input"][1]["content"][0]["text"].as_str().unwrap();
        assert_eq!(user.matches(JSON_ONLY_REINFORCEMENT).count(), 1);
        let system = body["input"][0]["content"][0]["text"].as_str().unwrap();
        assert!(!system.contains(JSON_ONLY_REINFORCEMENT));
    }

    #[test]
    fn test_schema_requires_all_six_fields() {
        let schema = prediction_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 6);
        assert_eq!(schema["additionalProperties"], false);
    }
}
