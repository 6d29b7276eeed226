use reqwest::{Client, Proxy};
use serde_json::Value;

use crate::config::OpenAiConfig;
use crate::errors::PredictError;
use crate::llm::response_parser::ResponseParser;

/// HTTP client for the `/responses` endpoint.
#[derive(Clone)]
pub struct ResponsesClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl std::fmt::Debug for ResponsesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsesClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ResponsesClient {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, PredictError> {
        let mut builder = Client::builder().timeout(config.request_timeout());

        match &config.proxy_url {
            Some(url) => {
                let proxy = Proxy::all(url).map_err(|e| {
                    PredictError::ConfigError(format!("Invalid proxy URL '{}': {}", url, e))
                })?;
                builder = builder.proxy(proxy);
                log::info!("proxy: {}", url);
            }
            None => log::info!("proxy: DIRECT"),
        }

        let client = builder
            .build()
            .map_err(|e| PredictError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            endpoint: format!("{}/responses", config.api_base.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs `body` and returns the model's output text.
    pub async fn send(&self, body: &Value) -> Result<String, PredictError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PredictError::ConfigError("missing OPENAI_API_KEY".to_string()))?;

        log::debug!(
            "Responses API request to {}: {}",
            self.endpoint,
            serde_json::to_string(body).unwrap_or_default()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        log::debug!("Responses API reply ({}): {}", status, response_text);

        if !status.is_success() {
            return Err(PredictError::upstream(status.as_u16(), &response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| PredictError::ParsingError(format!("Invalid JSON response: {}", e)))?;

        ResponseParser::extract_output_text(&response_json).ok_or_else(|| {
            PredictError::ParsingError("Response carried no output text".to_string())
        })
    }
}
