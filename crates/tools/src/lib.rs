pub mod bucket;
pub mod query;
pub mod registry;

use async_trait::async_trait;
use flowbridge_core::Result;
use serde_json::Value;

/// A named capability an agent loop can select and call.
///
/// Tools take exactly one string argument and return a structured payload or
/// raise. No state persists between invocations.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn describe(&self) -> &'static str;
    async fn invoke(&self, argument: &str) -> Result<Value>;
}

pub use bucket::BucketListTool;
pub use query::QueryTool;
pub use registry::ToolRegistry;
