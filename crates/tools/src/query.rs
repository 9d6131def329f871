use async_trait::async_trait;
use flowbridge_core::config::QueryEngineConfig;
use flowbridge_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::Tool;

static DATETIME_CTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"datetime\.datetime\([^)]*\)").expect("datetime constructor regex is valid")
});

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*$").expect("trailing comma regex is valid"));

/// Best-effort cosmetic cleanup of a textual row rendering: drop embedded
/// datetime constructor fragments, then a dangling trailing comma. The
/// output stays text, not typed rows.
pub fn scrub_row_text(raw: &str) -> String {
    let without_ctors = DATETIME_CTOR.replace_all(raw, "");
    TRAILING_COMMA.replace_all(&without_ctors, "").into_owned()
}

/// Split the engine connection URI into a request target and the bearer
/// token embedded as its `token` query parameter.
fn split_token(uri: &str) -> Result<(String, Option<String>)> {
    let mut url =
        Url::parse(uri).map_err(|e| Error::Config(format!("invalid query engine URI: {}", e)))?;

    let mut token = None;
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == "token" {
                token = Some(v.into_owned());
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    url.set_query(None);
    if !remaining.is_empty() {
        url.query_pairs_mut().extend_pairs(remaining);
    }

    Ok((url.to_string(), token))
}

/// Runs a SQL statement against the remote tabular engine.
///
/// Unlike the bucket tool, failures here are re-raised after logging; the
/// agent loop is expected to see the error.
pub struct QueryTool {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl QueryTool {
    pub fn new(config: &QueryEngineConfig) -> Result<Self> {
        let (endpoint, token) = split_token(&config.uri)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    async fn run_statement(&self, statement: &str) -> Result<String> {
        debug!(endpoint = %self.endpoint, "Executing query");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "sql": statement }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Request(format!("query engine request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &'static str {
        "sql_query"
    }

    fn describe(&self) -> &'static str {
        "Use this tool to run a SQL statement against the data engine. The input is the SQL text; the output is a textual rendering of the result rows."
    }

    async fn invoke(&self, argument: &str) -> Result<Value> {
        match self.run_statement(argument).await {
            Ok(rendered) => Ok(json!({ "results": scrub_row_text(&rendered) })),
            Err(e) => {
                error!(error = %e, "Query execution failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_removes_datetime_ctors() {
        let raw = "[('kiwi', 'gw', 1803222, datetime.datetime(2024, 1, 17, 0, 0), datetime.datetime(2024, 1, 17, 23, 59, 59))]";
        let cleaned = scrub_row_text(raw);
        assert!(!cleaned.contains("datetime.datetime("));
        assert!(cleaned.contains("'kiwi'"));
    }

    #[test]
    fn test_scrub_trims_trailing_comma() {
        let cleaned = scrub_row_text("('pear', 99172, datetime.datetime(2024, 1, 17, 0, 0)");
        assert!(!cleaned.ends_with(','));
        assert!(!cleaned.trim_end().ends_with(','));
    }

    #[test]
    fn test_scrub_spec_example() {
        let cleaned = scrub_row_text("row ends with datetime.datetime(2024, 1, 17, 0, 0)");
        assert!(!cleaned.contains("datetime.datetime("));
        assert_eq!(cleaned, "row ends with");
    }

    #[test]
    fn test_scrub_plain_text_untouched() {
        assert_eq!(scrub_row_text("[('a', 1), ('b', 2)]"), "[('a', 1), ('b', 2)]");
    }

    #[test]
    fn test_split_token() {
        let (endpoint, token) =
            split_token("https://engine.example:8443/sql?token=abc123").unwrap();
        assert_eq!(endpoint, "https://engine.example:8443/sql");
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_split_token_preserves_other_params() {
        let (endpoint, token) =
            split_token("https://engine.example/sql?catalog=main&token=t").unwrap();
        assert_eq!(endpoint, "https://engine.example/sql?catalog=main");
        assert_eq!(token.as_deref(), Some("t"));
    }

    #[test]
    fn test_split_token_absent() {
        let (endpoint, token) = split_token("https://engine.example/sql").unwrap();
        assert_eq!(endpoint, "https://engine.example/sql");
        assert!(token.is_none());
    }

    #[test]
    fn test_invalid_uri_rejected() {
        assert!(matches!(split_token("not a uri"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invoke_reraises_failure() {
        let tool = QueryTool::new(&QueryEngineConfig {
            uri: "http://127.0.0.1:9/sql?token=t".to_string(),
        })
        .unwrap();

        // No fallback value: the failure must propagate.
        assert!(tool.invoke("select 1").await.is_err());
    }
}
