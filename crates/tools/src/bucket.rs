use async_trait::async_trait;
use flowbridge_core::config::ObjectStoreConfig;
use flowbridge_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::Tool;

/// Strip surrounding quote characters an agent may wrap the argument in.
fn trim_quotes(argument: &str) -> &str {
    argument.trim().trim_matches(|c| c == '\'' || c == '"')
}

/// Collect the `<Key>` elements of a list-objects response.
fn parse_object_keys(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut keys = Vec::new();
    let mut inside_key = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"Key" {
                    inside_key = true;
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"Key" {
                    inside_key = false;
                }
            }
            Ok(Event::Text(ref e)) => {
                if inside_key {
                    if let Ok(text) = e.unescape() {
                        keys.push(text.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Tool(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(keys)
}

/// Lists the objects under a named bucket on an S3-compatible store.
///
/// Every failure degrades to an empty result plus a log line: callers cannot
/// tell "empty bucket" from "listing failed" without reading the logs. That
/// contract is load-bearing for the agent loop, which keys off "tool
/// returned a result" vs. "tool raised".
pub struct BucketListTool {
    client: Client,
    config: ObjectStoreConfig,
}

impl BucketListTool {
    pub fn new(config: ObjectStoreConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/{}?list-type=2",
            self.config.endpoint_url.trim_end_matches('/'),
            urlencoding::encode(bucket)
        );
        debug!(url = %url, "Listing bucket objects");

        let mut request = self.client.get(&url);
        if !self.config.access_key_id.is_empty() {
            request = request
                .header("x-access-key-id", &self.config.access_key_id)
                .header("x-secret-access-key", &self.config.secret_access_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Request(format!("object store request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        parse_object_keys(&body)
    }
}

#[async_trait]
impl Tool for BucketListTool {
    fn name(&self) -> &'static str {
        "list_bucket_contents"
    }

    fn describe(&self) -> &'static str {
        "Accepts only a bucket name as string. For example if the bucket name is demo, then the input is demo. Returns the list of items under the given bucket."
    }

    async fn invoke(&self, argument: &str) -> Result<Value> {
        let bucket = trim_quotes(argument);

        match self.list_objects(bucket).await {
            Ok(keys) => Ok(json!({ "results": keys })),
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "Bucket listing failed, returning empty result");
                Ok(json!({ "results": [] }))
            }
        }
    }
}
