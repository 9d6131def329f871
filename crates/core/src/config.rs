use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Remote model-serving endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Base URL of the serving endpoint, e.g. "http://localhost:9000".
    #[serde(default = "default_inference_endpoint")]
    pub endpoint_url: String,
    /// Model name sent in the model-selection header.
    #[serde(default = "default_model")]
    pub model: String,
    /// Task the model is served for. Determines response decoding.
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default = "default_generation")]
    pub generation: GenerationParams,
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
}

fn default_inference_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_model() -> String {
    "llama2-chat".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_generation() -> GenerationParams {
    GenerationParams::default()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_inference_endpoint(),
            model: default_model(),
            task: None,
            generation: GenerationParams::default(),
            timeout_seconds: default_timeout_secs(),
        }
    }
}

/// Default sampling parameters merged into every generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(default)]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f64,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

fn default_top_p() -> f64 {
    0.15
}

fn default_temperature() -> f64 {
    0.1
}

fn default_repetition_penalty() -> f64 {
    1.1
}

fn default_max_new_tokens() -> u32 {
    64
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            top_k: 0,
            top_p: default_top_p(),
            temperature: default_temperature(),
            repetition_penalty: default_repetition_penalty(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

/// Embedding-search service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieverConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_retriever_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub user_collection_name: String,
    #[serde(default)]
    pub master_collection_name: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default)]
    pub score_threshold: Option<f64>,
}

fn default_retriever_endpoint() -> String {
    "get-embeddings".to_string()
}

fn default_top_k() -> u32 {
    10
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            endpoint: default_retriever_endpoint(),
            collection_name: String::new(),
            user_collection_name: String::new(),
            master_collection_name: String::new(),
            top_k: default_top_k(),
            score_threshold: None,
        }
    }
}

/// S3-compatible object store reachable by the bucket listing tool.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreConfig {
    #[serde(default)]
    pub endpoint_url: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
}

/// Remote tabular engine reachable by the query tool.
/// The URI may embed a bearer token as a `token` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryEngineConfig {
    #[serde(default)]
    pub uri: String,
}

/// Flow persistence and dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowsConfig {
    /// SQLite database holding the flow table.
    #[serde(default = "default_flows_db")]
    pub db_path: String,
    /// Runner endpoint that executes a flow definition.
    #[serde(default)]
    pub runner_url: String,
    /// Event type the dispatcher accepts.
    #[serde(default = "default_event_type")]
    pub event_type: String,
}

fn default_flows_db() -> String {
    "~/.flowbridge/flows.db".to_string()
}

fn default_event_type() -> String {
    "dev.flowbridge.flow.execute.v1".to_string()
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            db_path: default_flows_db(),
            runner_url: String::new(),
            event_type: default_event_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8700
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

/// Conversation memory formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    #[serde(default = "default_human_label")]
    pub human_label: String,
    #[serde(default = "default_ai_label")]
    pub ai_label: String,
    /// Chat-control-token mode: "none" or "llama2".
    #[serde(default = "default_chat_markers")]
    pub chat_markers: String,
    /// Number of human/assistant exchanges kept when rendering.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_memory_user")]
    pub user: String,
    #[serde(default)]
    pub prompt_id: String,
}

fn default_human_label() -> String {
    "User".to_string()
}

fn default_ai_label() -> String {
    "Assistant".to_string()
}

fn default_chat_markers() -> String {
    "none".to_string()
}

fn default_history_window() -> usize {
    2
}

fn default_memory_user() -> String {
    "anonymous".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            human_label: default_human_label(),
            ai_label: default_ai_label(),
            chat_markers: default_chat_markers(),
            history_window: default_history_window(),
            user: default_memory_user(),
            prompt_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub query_engine: QueryEngineConfig,
    #[serde(default)]
    pub flows: FlowsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
