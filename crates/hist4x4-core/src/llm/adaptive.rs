//! Adaptive request sender
//!
//! Not every model behind the Responses endpoint supports strict schema output
//! or a sampling temperature. The sender starts with both and degrades one
//! rung at a time, each rung tried exactly once:
//!
//! 1. strict `json_schema` output with temperature;
//! 2. the same request without temperature, if the temperature was refused;
//! 3. `json_object` output with temperature and a JSON-only reminder in the
//!    user prompt, if the strict schema was refused, again dropping the
//!    temperature once if that is refused.
//!
//! Every other failure is returned unchanged.

use async_trait::async_trait;

use crate::config::OpenAiConfig;
use crate::draws::DrawCode;
use crate::errors::PredictError;
use crate::llm::classifier::{classify, Outcome};
use crate::llm::client::ResponsesClient;
use crate::llm::request::PredictionRequest;
use crate::llm::Predictor;
use crate::prediction::PredictionResult;

#[derive(Debug, Clone)]
pub struct AdaptivePredictor {
    client: ResponsesClient,
    model: String,
    temperature: f64,
}

impl AdaptivePredictor {
    pub fn new(config: &OpenAiConfig) -> Result<Self, PredictError> {
        Ok(Self {
            client: ResponsesClient::from_config(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        let text = self.client.send(&request.to_body()).await?;
        PredictionResult::from_model_text(&text)
    }

    /// Sends `request`; if the temperature is refused, resends once without it.
    async fn send_with_temperature_fallback(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, PredictError> {
        let result = self.send_once(request).await;
        if classify(&result) == Outcome::UnsupportedParameter && request.temperature.is_some() {
            log::warn!(
                "Model '{}' refused the temperature parameter, retrying without it",
                self.model
            );
            return self.send_once(&request.without_temperature()).await;
        }
        result
    }
}

#[async_trait]
impl Predictor for AdaptivePredictor {
    async fn predict(&self, draws: &[DrawCode]) -> Result<PredictionResult, PredictError> {
        let strict = PredictionRequest::strict(&self.model, draws, self.temperature);
        log::info!(
            "Requesting prediction from '{}' over {} draws",
            self.model,
            strict.draws.len()
        );

        let result = self.send_with_temperature_fallback(&strict).await;
        match (classify(&result), result) {
            (Outcome::UnsupportedSchema, Err(err)) => {
                log::warn!(
                    "Model '{}' refused strict schema output, falling back to json_object: {}",
                    self.model,
                    err
                );
                let loose = strict.loosened(self.temperature);
                self.send_with_temperature_fallback(&loose)
                    .await
                    .inspect_err(|e| log::error!("Prediction failed after fallback: {}", e))
            }
            (_, Err(err)) => {
                log::error!("Prediction failed: {}", err);
                Err(err)
            }
            (_, ok) => ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::Verdict;
    use crate::prompt::JSON_ONLY_REINFORCEMENT;
    use crate::test_utils::mock_responses_server::MockResponsesServer;
    use serde_json::{json, Value};

    const TEMPERATURE_REFUSED: &str = r#"{"error":{"message":"Unsupported parameter: 'temperature' is not supported with this model.","type":"invalid_request_error","param":"temperature","code":null}}"#;
    const SCHEMA_REFUSED: &str = r#"{"error":{"message":"Invalid parameter: 'text.format' of type 'json_schema' is not supported with this model.","type":"invalid_request_error","param":"text.format","code":null}}"#;

    fn draws() -> Vec<DrawCode> {
        (0..20)
            .map(|i| DrawCode::parse(&format!("{:05}", 17806 + i)).unwrap())
            .collect()
    }

    fn prediction_json() -> Value {
        json!({
            "front": "不重",
            "back": "重号",
            "front_confidence": 0.71,
            "back_confidence": 0.58,
            "front_tau_distance": 0.2,
            "back_tau_distance": 0.07,
            "notes": "样本偏少"
        })
    }

    fn output_text_reply() -> Value {
        json!({ "id": "resp_1", "output_text": prediction_json().to_string() })
    }

    fn predictor_for(server: &MockResponsesServer) -> AdaptivePredictor {
        let config = OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            api_base: format!("{}/v1", server.address()),
            ..Default::default()
        };
        AdaptivePredictor::new(&config).unwrap()
    }

    fn user_text(body: &Value) -> &str {
        body["input"][1]["content"][0]["text"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let server = MockResponsesServer::start(vec![(200, output_text_reply())]).await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();

        assert_eq!(result.front, Verdict::NoDuplicate);
        assert_eq!(result.back, Verdict::Duplicate);
        assert_eq!(result.notes.as_deref(), Some("样本偏少"));

        let requests = server.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["text"]["format"]["type"], "json_schema");
        assert_eq!(requests[0]["temperature"], 0.2);
        assert_eq!(server.authorization_headers()[0], "Bearer sk-test");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_temperature_refused_then_retry_succeeds() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (200, output_text_reply()),
        ])
        .await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result.front_confidence, 0.71);

        let requests = server.get_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].get("temperature").is_none());
        assert_eq!(requests[1]["text"]["format"]["type"], "json_schema");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_after_temperature_retry_propagates() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (503, MockResponsesServer::raw("upstream overloaded")),
        ])
        .await;
        let err = predictor_for(&server).predict(&draws()).await.unwrap_err();
        assert_eq!(err, PredictError::upstream(503, "upstream overloaded"));
        assert_eq!(server.get_requests().len(), 2);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_schema_refused_switches_to_json_object() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(SCHEMA_REFUSED)),
            (200, output_text_reply()),
        ])
        .await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result, PredictionResult::from_model_text(&prediction_json().to_string()).unwrap());

        let requests = server.get_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1]["text"]["format"], json!({ "type": "json_object" }));
        assert_eq!(requests[1]["temperature"], 0.2);
        assert_eq!(user_text(&requests[1]).matches(JSON_ONLY_REINFORCEMENT).count(), 1);
        assert!(!user_text(&requests[0]).contains(JSON_ONLY_REINFORCEMENT));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_schema_and_temperature_both_refused() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(SCHEMA_REFUSED)),
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (200, output_text_reply()),
        ])
        .await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result.back_tau_distance, 0.07);

        let requests = server.get_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2]["text"]["format"]["type"], "json_object");
        assert!(requests[2].get("temperature").is_none());
        assert_eq!(user_text(&requests[2]).matches(JSON_ONLY_REINFORCEMENT).count(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_schema_refused_after_temperature_retry() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (400, MockResponsesServer::raw(SCHEMA_REFUSED)),
            (200, output_text_reply()),
        ])
        .await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result.front, Verdict::NoDuplicate);

        let requests = server.get_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0]["temperature"], 0.2);
        assert!(requests[1].get("temperature").is_none());
        assert_eq!(requests[1]["text"]["format"]["type"], "json_schema");
        assert_eq!(requests[2]["text"]["format"], json!({ "type": "json_object" }));
        assert_eq!(requests[2]["temperature"], 0.2);
        assert_eq!(user_text(&requests[2]).matches(JSON_ONLY_REINFORCEMENT).count(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_longest_ladder_path_makes_four_calls() {
        let server = MockResponsesServer::start(vec![
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (400, MockResponsesServer::raw(SCHEMA_REFUSED)),
            (400, MockResponsesServer::raw(TEMPERATURE_REFUSED)),
            (200, output_text_reply()),
        ])
        .await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result.back, Verdict::Duplicate);

        let requests = server.get_requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3]["text"]["format"]["type"], "json_object");
        assert!(requests[3].get("temperature").is_none());
        assert_eq!(user_text(&requests[3]).matches(JSON_ONLY_REINFORCEMENT).count(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_unrelated_server_error_is_not_retried() {
        let server = MockResponsesServer::start(vec![
            (500, MockResponsesServer::raw("internal error, please retry")),
            (200, output_text_reply()),
        ])
        .await;
        let err = predictor_for(&server).predict(&draws()).await.unwrap_err();
        assert!(matches!(err, PredictError::UpstreamError { status: 500, .. }));
        assert_eq!(server.get_requests().len(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_model_text_is_not_retried() {
        let server = MockResponsesServer::start(vec![
            (200, json!({ "output_text": "the front four will repeat" })),
            (200, output_text_reply()),
        ])
        .await;
        let err = predictor_for(&server).predict(&draws()).await.unwrap_err();
        assert!(matches!(err, PredictError::ParsingError(_)));
        assert_eq!(server.get_requests().len(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_output_items_reply_is_parsed() {
        let reply = json!({
            "output": [{
                "type": "message",
                "content": [{ "type": "output_text", "text": prediction_json().to_string() }]
            }]
        });
        let server = MockResponsesServer::start(vec![(200, reply)]).await;
        let result = predictor_for(&server).predict(&draws()).await.unwrap();
        assert_eq!(result.front_tau_distance, 0.2);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockResponsesServer::start_with_delay(
            vec![(200, output_text_reply())],
            std::time::Duration::from_secs(3),
        )
        .await;
        let config = OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            api_base: format!("{}/v1", server.address()),
            request_timeout_secs: 1,
            ..Default::default()
        };
        let err = AdaptivePredictor::new(&config)
            .unwrap()
            .predict(&draws())
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Timeout(_)));
        assert_eq!(server.get_requests().len(), 1);
        server.shutdown().await;
    }
}
