//! In-memory vector store using cosine similarity.
//!
//! Backed by a `HashMap` behind a `tokio::sync::RwLock`; used for
//! development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{PartialUpsert, VectorStore};

fn store_err(message: impl Into<String>) -> RagError {
    RagError::VectorStore { backend: "InMemory".into(), message: message.into() }
}

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    chunks: HashMap<String, Chunk>,
}

/// An in-memory [`VectorStore`] using cosine similarity for search.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored in a collection (test convenience).
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.chunks.len())
            .unwrap_or(0)
    }

    /// Whether a collection holds no chunks.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, chunks: HashMap::new() });
        Ok(())
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>> {
        let collections = self.collections.read().await;
        Ok(collections.get(name).map(|c| c.dimensions))
    }

    async fn upsert(
        &self,
        collection: &str,
        chunks: &[Chunk],
    ) -> std::result::Result<(), PartialUpsert> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| PartialUpsert {
            written_ids: Vec::new(),
            error: store_err(format!("collection '{collection}' does not exist")),
        })?;
        for chunk in chunks {
            store.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections
            .get_mut(collection)
            .ok_or_else(|| store_err(format!("collection '{collection}' does not exist")))?;
        for id in ids {
            store.chunks.remove(id);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections
            .get(collection)
            .ok_or_else(|| store_err(format!("collection '{collection}' does not exist")))?;

        let mut scored: Vec<SearchResult> = store
            .chunks
            .values()
            .map(|chunk| SearchResult {
                score: cosine_similarity(&chunk.embedding, embedding),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
