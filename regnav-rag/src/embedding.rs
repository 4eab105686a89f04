//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The same provider instance must be used for ingestion and query
/// embedding: mixing embedding models across the two corrupts similarity
/// scores silently. The gateway enforces this by owning a single provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially. Backends with native batch endpoints should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The dimensionality of embeddings produced by this provider.
    ///
    /// A provider that cannot report its dimensionality returns 0, which the
    /// gateway treats as a provisioning error.
    fn dimensions(&self) -> usize;
}
