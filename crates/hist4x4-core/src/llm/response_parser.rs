//! Extraction of the model's text from a Responses API reply.
//!
//! Three reply shapes are accepted, in order of preference:
//! a top-level `output_text`, a list of `output` items carrying text content,
//! and the chat-style `choices[0].message.content` some gateways return.

use serde_json::Value;

const TEXT_CONTENT_TYPES: [&str; 3] = ["output_text", "input_text", "text"];

pub struct ResponseParser;

impl ResponseParser {
    /// Returns the model's answer text, or `None` if the reply has none.
    pub fn extract_output_text(response: &Value) -> Option<String> {
        Self::convenience_text(response)
            .or_else(|| Self::output_items_text(response))
            .or_else(|| Self::chat_text(response))
    }

    fn convenience_text(response: &Value) -> Option<String> {
        response
            .get("output_text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn output_items_text(response: &Value) -> Option<String> {
        let segments: Vec<&str> = response
            .get("output")
            .and_then(Value::as_array)?
            .iter()
            .filter_map(|item| item.get("content").and_then(Value::as_array))
            .flatten()
            .filter(|content| {
                content
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| TEXT_CONTENT_TYPES.contains(&t))
            })
            .map(|content| content.get("text").and_then(Value::as_str).unwrap_or(""))
            .collect();

        let text = segments.concat();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn chat_text(response: &Value) -> Option<String> {
        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}
