use async_trait::async_trait;
use flowbridge_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::store::FlowRecord;

/// Hand-off seam to whatever runs a flow definition. The dispatcher only
/// loads and forwards; execution belongs to the orchestration runtime.
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    async fn execute(&self, record: &FlowRecord, tweaks: &Value, inputs: &Value) -> Result<Value>;
}

/// Delegates execution to a remote runner endpoint.
pub struct HttpFlowExecutor {
    client: Client,
    runner_url: String,
}

impl HttpFlowExecutor {
    pub fn new(runner_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            runner_url: runner_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FlowExecutor for HttpFlowExecutor {
    async fn execute(&self, record: &FlowRecord, tweaks: &Value, inputs: &Value) -> Result<Value> {
        let body = json!({
            "flow": record.data,
            "tweaks": tweaks,
            "inputs": inputs,
        });

        debug!(runner = %self.runner_url, flow_id = %record.id, "Dispatching flow to runner");

        let response = self
            .client
            .post(&self.runner_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(format!("flow runner request failed: {}", e)))?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw, "Flow runner returned an error status");
            return Err(Error::Transport {
                status: status.as_u16(),
                body: raw,
            });
        }

        Ok(serde_json::from_str(&raw)?)
    }
}
