use std::collections::HashMap;
use std::sync::Arc;

use flowbridge_core::{Error, Result};
use serde_json::Value;
use tracing::debug;

use crate::Tool;

/// Name-indexed tool set handed to an agent loop.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(name = tool.name(), "Registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// One `name: description` line per tool, for prompt injection.
    pub fn describe_all(&self) -> String {
        let mut lines: Vec<String> = self
            .tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.describe().trim()))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    pub async fn invoke(&self, name: &str, argument: &str) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        debug!(tool = name, "Invoking tool");
        tool.invoke(argument).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn describe(&self) -> &'static str {
            "Returns its argument unchanged."
        }

        async fn invoke(&self, argument: &str) -> Result<Value> {
            Ok(json!({ "results": argument }))
        }
    }

    #[test]
    fn test_empty_registry() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("echo").is_none());
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));

        assert_eq!(reg.tool_names(), vec!["echo".to_string()]);
        let out = reg.invoke("echo", "hello").await.unwrap();
        assert_eq!(out["results"], "hello");
    }

    #[tokio::test]
    async fn test_unknown_tool_fails() {
        let reg = ToolRegistry::new();
        let err = reg.invoke("missing", "x").await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[test]
    fn test_describe_all_lists_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let brief = reg.describe_all();
        assert!(brief.contains("- echo: Returns its argument unchanged."));
    }
}
