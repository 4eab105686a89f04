//! Vector store trait for storing and searching embedded chunks.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Outcome of a batch upsert that did not complete.
///
/// Carries the ids of records that were (or may have been) written before
/// the failure, so compensation can branch on data rather than intercept
/// errors. Backends that write a batch in a single call and cannot tell
/// which records landed report every attempted id.
#[derive(Debug)]
pub struct PartialUpsert {
    /// Ids written (or possibly written) before the failure.
    pub written_ids: Vec<String>,
    /// The underlying error.
    pub error: RagError,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections with fixed dimensionality and
/// cosine similarity. The batch upsert is not transactional: a mid-batch
/// failure surfaces as [`PartialUpsert`] and the caller performs the
/// compensating delete.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection if it does not already exist.
    ///
    /// Idempotent: an existing collection is left untouched (including its
    /// dimensionality — use [`collection_dimensions`](VectorStore::collection_dimensions)
    /// to validate it).
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Report the dimensionality of an existing collection, or `None` if
    /// the collection does not exist.
    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>>;

    /// Write chunks into a collection. Chunks must have ids and embeddings set.
    async fn upsert(
        &self,
        collection: &str,
        chunks: &[Chunk],
    ) -> std::result::Result<(), PartialUpsert>;

    /// Best-effort removal of chunks by id.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Return the `top_k` most similar chunks to the given embedding,
    /// ordered by descending score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
