use flowbridge_core::config::RetrieverConfig;
use flowbridge_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::client::build_http_client;

/// A retrieved context section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    embeddings: Vec<Document>,
}

/// Client for the embedding-search service. The search itself runs remotely;
/// this only shapes the query and unwraps the scored sections.
pub struct EmbeddingRetriever {
    client: Client,
    config: RetrieverConfig,
}

impl EmbeddingRetriever {
    pub fn new(config: RetrieverConfig) -> Self {
        Self {
            client: build_http_client(Duration::from_secs(60)),
            config,
        }
    }

    fn query_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.endpoint
        )
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let body = json!({
            "query": query,
            "limit": self.config.top_k,
            "collection_name": self.config.collection_name,
            "user_collection_name": self.config.user_collection_name,
            "master_collection_name": self.config.master_collection_name,
            "filter_options": {},
            "score_threshold": self.config.score_threshold,
        });

        let url = self.query_url();
        debug!(url = %url, limit = self.config.top_k, "Querying embedding service");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(format!("embedding service request failed: {}", e)))?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw, "Embedding service returned an error status");
            return Err(Error::Transport {
                status: status.as_u16(),
                body: raw,
            });
        }

        let decoded: RetrieveResponse = serde_json::from_str(&raw)
            .map_err(|e| Error::Upstream(format!("malformed embedding response: {}", e)))?;
        Ok(decoded.embeddings)
    }
}
