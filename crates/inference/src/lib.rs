pub mod client;
pub mod retriever;
pub mod stop;
pub mod v2;

use async_trait::async_trait;
use flowbridge_core::Result;

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String>;
}

/// A text-to-vector embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Per-element application of `embed`, preserving input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

pub use retriever::{Document, EmbeddingRetriever};
pub use stop::enforce_stop_tokens;
pub use v2::{InferenceClient, TaskKind};
