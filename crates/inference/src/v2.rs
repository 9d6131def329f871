use async_trait::async_trait;
use flowbridge_core::config::{GenerationParams, InferenceConfig};
use flowbridge_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::client::build_http_client;
use crate::stop::enforce_stop_tokens;
use crate::{Embedder, LanguageModel};

/// All models are exposed under the fixed `model` route; the actual model is
/// selected by the routing header.
const INFER_PATH: &str = "/v2/models/model/infer";
const MODEL_HEADER: &str = "Seldon-Model";

/// Task the remote model is served for. Determines how responses decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    TextGeneration,
    Text2TextGeneration,
    Summarization,
    QuestionAnswering,
}

impl TaskKind {
    pub const SUPPORTED: &'static str =
        "text-generation, text2text-generation, summarization, question-answering";

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::TextGeneration => "text-generation",
            TaskKind::Text2TextGeneration => "text2text-generation",
            TaskKind::Summarization => "summarization",
            TaskKind::QuestionAnswering => "question-answering",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text-generation" => Ok(TaskKind::TextGeneration),
            "text2text-generation" => Ok(TaskKind::Text2TextGeneration),
            "summarization" => Ok(TaskKind::Summarization),
            "question-answering" => Ok(TaskKind::QuestionAnswering),
            other => Err(Error::UnsupportedTask(format!(
                "{}, supported tasks are: {}",
                other,
                Self::SUPPORTED
            ))),
        }
    }
}

/// Encode a named-input map into the V2 inference envelope.
///
/// One entry per input; string values are tagged `"str"`, everything else
/// `"raw"`. The envelope groups entries under the fixed `hf` context marker.
fn encode_request(payload: &Map<String, Value>) -> Value {
    let inputs: Vec<Value> = payload
        .iter()
        .map(|(name, value)| {
            let content_type = if value.is_string() { "str" } else { "raw" };
            json!({
                "name": name,
                "shape": [-1],
                "datatype": "BYTES",
                "parameters": { "content_type": content_type },
                "data": [value]
            })
        })
        .collect();

    json!({
        "parameters": { "context_type": "hf" },
        "inputs": inputs,
    })
}

/// Build the named-input map for a task. Question-answering takes the first
/// two inputs as question and context; every other task (and the untasked
/// embedding path) sends `array_inputs`. Generation parameters merge into the
/// same map; names stay unique because later entries replace earlier ones.
fn build_payload(
    task: Option<TaskKind>,
    inputs: &[&str],
    params: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let mut payload = Map::new();

    if task == Some(TaskKind::QuestionAnswering) {
        let question = inputs.first().ok_or_else(|| {
            Error::Validation("question-answering requires a question input".to_string())
        })?;
        let context = inputs.get(1).ok_or_else(|| {
            Error::Validation("question-answering requires a context input".to_string())
        })?;
        payload.insert("question".to_string(), json!(question));
        payload.insert("context".to_string(), json!(context));
    } else if inputs.len() == 1 {
        payload.insert("array_inputs".to_string(), json!(inputs[0]));
    } else {
        payload.insert("array_inputs".to_string(), json!(inputs));
    }

    for (name, value) in params {
        payload.insert(name.clone(), value.clone());
    }
    Ok(payload)
}

/// Sampling defaults as the endpoint's keyword arguments. The wire names are
/// fixed by the serving stack regardless of config field casing.
fn generation_params(g: &GenerationParams) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("top_k".to_string(), json!(g.top_k));
    params.insert("top_p".to_string(), json!(g.top_p));
    params.insert("temperature".to_string(), json!(g.temperature));
    params.insert("repetition_penalty".to_string(), json!(g.repetition_penalty));
    params.insert("max_new_tokens".to_string(), json!(g.max_new_tokens));
    params
}

/// `outputs[0].data[0]` holds a JSON-encoded, task-specific payload.
fn first_output_payload(response: &Value) -> Result<&str> {
    response
        .get("outputs")
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("data"))
        .and_then(|d| d.get(0))
        .and_then(|d| d.as_str())
        .ok_or_else(|| Error::Upstream("response has no outputs[0].data[0] payload".to_string()))
}

/// Reject responses that carry an application-level error field.
fn check_upstream_error(response: &Value) -> Result<()> {
    if let Some(err) = response.get("error") {
        let message = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(Error::Upstream(message));
    }
    Ok(())
}

/// Decode the task-specific payload into plain text.
fn decode_task_text(task: TaskKind, prompt: &str, response: &Value) -> Result<String> {
    check_upstream_error(response)?;
    let decoded: Value = serde_json::from_str(first_output_payload(response)?)?;

    let text = match task {
        TaskKind::TextGeneration => {
            // Only the first candidate is used; the endpoint echoes the
            // prompt in front of it.
            let generated = decoded
                .get(0)
                .and_then(|c| c.get("generated_text"))
                .and_then(|t| t.as_str())
                .ok_or_else(|| {
                    Error::Upstream("text-generation response has no generated_text".to_string())
                })?;
            generated.strip_prefix(prompt).unwrap_or(generated).to_string()
        }
        TaskKind::Text2TextGeneration => decoded
            .get("generated_text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                Error::Upstream("text2text-generation response has no generated_text".to_string())
            })?
            .to_string(),
        TaskKind::Summarization => decoded
            .get("summary_text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                Error::Upstream("summarization response has no summary_text".to_string())
            })?
            .to_string(),
        TaskKind::QuestionAnswering => decoded
            .get("answer")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                Error::Upstream("question-answering response has no answer".to_string())
            })?
            .to_string(),
    };

    Ok(text)
}

/// The embedding path reads `outputs[0].data` as a flat numeric sequence.
fn decode_embedding(response: &Value) -> Result<Vec<f32>> {
    check_upstream_error(response)?;
    let data = response
        .get("outputs")
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("data"))
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Upstream("response has no outputs[0].data sequence".to_string()))?;

    data.iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                Error::Upstream(format!("non-numeric embedding element: {}", v))
            })
        })
        .collect()
}

/// Client for a V2-protocol model-serving endpoint.
///
/// Constructed once and passed by reference into whatever needs it; there is
/// no ambient shared instance.
pub struct InferenceClient {
    client: Client,
    infer_url: String,
    model: String,
    task: Option<TaskKind>,
    params: Map<String, Value>,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let task = match config.task.as_deref() {
            Some(s) => Some(TaskKind::parse(s)?),
            None => None,
        };

        let params = generation_params(&config.generation);

        let infer_url = format!(
            "{}{}",
            config.endpoint_url.trim_end_matches('/'),
            INFER_PATH
        );

        Ok(Self {
            client: build_http_client(Duration::from_secs(config.timeout_seconds)),
            infer_url,
            model: config.model.clone(),
            task,
            params,
        })
    }

    pub fn task(&self) -> Option<TaskKind> {
        self.task
    }

    async fn post_payload(&self, payload: &Map<String, Value>) -> Result<Value> {
        let envelope = encode_request(payload);
        debug!(url = %self.infer_url, model = %self.model, inputs = payload.len(), "Calling inference endpoint");

        let response = self
            .client
            .post(&self.infer_url)
            .header(MODEL_HEADER, &self.model)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| Error::Request(format!("inference request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %body, "Inference endpoint returned an error status");
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Raw entry point: send named inputs plus explicit parameters and return
    /// the undecoded response envelope.
    pub async fn infer(&self, inputs: &[&str], params: &Map<String, Value>) -> Result<Value> {
        let payload = build_payload(self.task, inputs, params)?;
        self.post_payload(&payload).await
    }

    /// Answer a question against a context (question-answering task only).
    pub async fn answer(&self, question: &str, context: &str, stop: &[String]) -> Result<String> {
        let response = self.infer(&[question, context], &self.params).await?;
        let task = self.require_task()?;
        let text = decode_task_text(task, question, &response)?;
        Ok(enforce_stop_tokens(&text, stop))
    }

    fn require_task(&self) -> Result<TaskKind> {
        self.task
            .ok_or_else(|| Error::UnsupportedTask(format!("none, supported tasks are: {}", TaskKind::SUPPORTED)))
    }
}

#[async_trait]
impl LanguageModel for InferenceClient {
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String> {
        let task = self.require_task()?;
        if task == TaskKind::QuestionAnswering {
            return Err(Error::Validation(
                "question-answering needs question and context; use answer()".to_string(),
            ));
        }
        let response = self.infer(&[prompt], &self.params).await?;
        let text = decode_task_text(task, prompt, &response)?;
        Ok(enforce_stop_tokens(&text, stop))
    }
}

#[async_trait]
impl Embedder for InferenceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Same transport call, no task tag and no generation parameters.
        let payload = build_payload(None, &[text], &Map::new())?;
        let response = self.post_payload(&payload).await?;
        decode_embedding(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_with_payload(payload: &str) -> Value {
        json!({ "outputs": [ { "data": [payload] } ] })
    }

    #[test]
    fn test_task_parse_all_supported() {
        assert_eq!(TaskKind::parse("text-generation").unwrap(), TaskKind::TextGeneration);
        assert_eq!(
            TaskKind::parse("text2text-generation").unwrap(),
            TaskKind::Text2TextGeneration
        );
        assert_eq!(TaskKind::parse("summarization").unwrap(), TaskKind::Summarization);
        assert_eq!(
            TaskKind::parse("question-answering").unwrap(),
            TaskKind::QuestionAnswering
        );
    }

    #[test]
    fn test_task_parse_unknown_fails() {
        let err = TaskKind::parse("image-classification").unwrap_err();
        assert!(matches!(err, Error::UnsupportedTask(_)));
    }

    #[test]
    fn test_encode_request_shape() {
        let mut payload = Map::new();
        payload.insert("array_inputs".to_string(), json!("hello"));
        payload.insert("max_new_tokens".to_string(), json!(64));

        let envelope = encode_request(&payload);
        assert_eq!(envelope["parameters"]["context_type"], "hf");

        let inputs = envelope["inputs"].as_array().unwrap();
        assert_eq!(inputs.len(), 2);
        for entry in inputs {
            assert_eq!(entry["shape"], json!([-1]));
            assert_eq!(entry["datatype"], "BYTES");
            assert_eq!(entry["data"].as_array().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_encode_request_content_kind() {
        let mut payload = Map::new();
        payload.insert("array_inputs".to_string(), json!("text value"));
        payload.insert("temperature".to_string(), json!(0.1));

        let envelope = encode_request(&payload);
        for entry in envelope["inputs"].as_array().unwrap() {
            let kind = entry["parameters"]["content_type"].as_str().unwrap();
            if entry["name"] == "array_inputs" {
                assert_eq!(kind, "str");
            } else {
                assert_eq!(kind, "raw");
            }
        }
    }

    #[test]
    fn test_build_payload_question_answering() {
        let payload =
            build_payload(Some(TaskKind::QuestionAnswering), &["why?", "because"], &Map::new())
                .unwrap();
        assert_eq!(payload["question"], "why?");
        assert_eq!(payload["context"], "because");
        assert!(!payload.contains_key("array_inputs"));
    }

    #[test]
    fn test_build_payload_question_answering_missing_context() {
        let err = build_payload(Some(TaskKind::QuestionAnswering), &["why?"], &Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_build_payload_merges_params() {
        let mut params = Map::new();
        params.insert("temperature".to_string(), json!(0.4));
        let payload = build_payload(Some(TaskKind::TextGeneration), &["p"], &params).unwrap();
        assert_eq!(payload["array_inputs"], "p");
        assert_eq!(payload["temperature"], json!(0.4));
    }

    #[test]
    fn test_decode_text_generation_strips_prompt() {
        let inner = json!([{ "generated_text": "Once upon a time there was a fox" }]);
        let response = envelope_with_payload(&inner.to_string());
        let text =
            decode_task_text(TaskKind::TextGeneration, "Once upon a time", &response).unwrap();
        assert_eq!(text, " there was a fox");
    }

    #[test]
    fn test_decode_text2text_generation() {
        let inner = json!({ "generated_text": "SELECT * FROM t" });
        let response = envelope_with_payload(&inner.to_string());
        let text = decode_task_text(TaskKind::Text2TextGeneration, "ignored", &response).unwrap();
        assert_eq!(text, "SELECT * FROM t");
    }

    #[test]
    fn test_decode_summarization() {
        let inner = json!({ "summary_text": "short version" });
        let response = envelope_with_payload(&inner.to_string());
        let text = decode_task_text(TaskKind::Summarization, "", &response).unwrap();
        assert_eq!(text, "short version");
    }

    #[test]
    fn test_decode_question_answering() {
        let inner = json!({ "answer": "42" });
        let response = envelope_with_payload(&inner.to_string());
        let text = decode_task_text(TaskKind::QuestionAnswering, "", &response).unwrap();
        assert_eq!(text, "42");
    }

    #[test]
    fn test_decode_upstream_error_field() {
        let response = json!({ "error": "model not loaded" });
        let err = decode_task_text(TaskKind::Summarization, "", &response).unwrap_err();
        match err {
            Error::Upstream(msg) => assert_eq!(msg, "model not loaded"),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let inner = json!({ "unexpected": true });
        let response = envelope_with_payload(&inner.to_string());
        let err = decode_task_text(TaskKind::Summarization, "", &response).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[test]
    fn test_decode_embedding() {
        let response = json!({ "outputs": [ { "data": [0.25, -1.0, 3.5] } ] });
        let embedding = decode_embedding(&response).unwrap();
        assert_eq!(embedding, vec![0.25_f32, -1.0, 3.5]);
    }

    #[test]
    fn test_decode_embedding_error_field() {
        let response = json!({ "error": "embedding model offline" });
        assert!(matches!(decode_embedding(&response), Err(Error::Upstream(_))));
    }

    #[test]
    fn test_generation_params_use_wire_names() {
        let params = generation_params(&flowbridge_core::config::GenerationParams::default());
        for key in ["top_k", "top_p", "temperature", "repetition_penalty", "max_new_tokens"] {
            assert!(params.contains_key(key), "missing wire param {}", key);
        }
        assert_eq!(params["max_new_tokens"], json!(64));
    }

    #[test]
    fn test_client_rejects_unknown_task() {
        let mut config = flowbridge_core::config::InferenceConfig::default();
        config.task = Some("token-classification".to_string());
        assert!(matches!(
            InferenceClient::new(&config),
            Err(Error::UnsupportedTask(_))
        ));
    }

    #[test]
    fn test_client_builds_infer_url() {
        let mut config = flowbridge_core::config::InferenceConfig::default();
        config.endpoint_url = "http://serving:9000/".to_string();
        config.task = Some("text-generation".to_string());
        let client = InferenceClient::new(&config).unwrap();
        assert_eq!(client.infer_url, "http://serving:9000/v2/models/model/infer");
        assert_eq!(client.task(), Some(TaskKind::TextGeneration));
    }
}
