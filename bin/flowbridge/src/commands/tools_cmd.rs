use std::sync::Arc;

use flowbridge_core::Config;
use flowbridge_tools::{BucketListTool, QueryTool, ToolRegistry};

/// Build the default tool set from config. The query tool only registers
/// when an engine URI is configured.
pub fn build_registry(config: &Config) -> flowbridge_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BucketListTool::new(config.object_store.clone())));
    if !config.query_engine.uri.is_empty() {
        registry.register(Arc::new(QueryTool::new(&config.query_engine)?));
    }
    Ok(registry)
}

pub fn list() -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let registry = build_registry(&config)?;
    println!("{}", registry.describe_all());
    Ok(())
}

pub async fn run(name: &str, argument: &str) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let registry = build_registry(&config)?;

    let result = registry.invoke(name, argument).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
