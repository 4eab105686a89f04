//! Vector store gateway.
//!
//! [`VectorGateway`] owns the embedding provider, the vector store
//! backend, and the collection name. It is the only component that
//! embeds text, which keeps ingestion and query embeddings in the same
//! embedding space.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{PartialUpsert, VectorStore};

/// Gateway over the embedding model and vector index for one collection.
pub struct VectorGateway {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl VectorGateway {
    /// Create a gateway for the named collection.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self { embedder, store, collection: collection.into() }
    }

    /// The collection this gateway serves.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Provision the collection for the configured embedder.
    ///
    /// Idempotent. Fails with [`RagError::Provisioning`] when the embedder
    /// cannot report a dimensionality, or when the collection already
    /// exists with a different dimensionality — call this at startup so a
    /// misconfigured embedding model fails fast instead of writing
    /// wrong-dimension vectors.
    pub async fn ensure_collection(&self) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        if dimensions == 0 {
            return Err(RagError::Provisioning(
                "embedding provider does not report a dimensionality".to_string(),
            ));
        }

        if let Some(existing) = self.store.collection_dimensions(&self.collection).await? {
            if existing != dimensions {
                return Err(RagError::Provisioning(format!(
                    "collection '{}' has dimensionality {existing} but the configured \
                     embedding model produces {dimensions}-dimensional vectors",
                    self.collection
                )));
            }
            debug!(collection = %self.collection, dimensions, "collection already provisioned");
            return Ok(());
        }

        self.store.ensure_collection(&self.collection, dimensions).await?;
        info!(collection = %self.collection, dimensions, "provisioned collection");
        Ok(())
    }

    /// Embed and write a batch of chunks, returning the assigned ids.
    ///
    /// Embeddings are computed in chunk order; chunks without an id get a
    /// fresh UUID. Not transactional: a mid-batch failure surfaces as
    /// [`PartialUpsert`] carrying the ids that were (or may have been)
    /// written, and the caller performs the compensating delete.
    pub async fn upsert(
        &self,
        mut chunks: Vec<Chunk>,
    ) -> std::result::Result<Vec<String>, PartialUpsert> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            self.embedder
                .embed_batch(&texts)
                .await
                .map_err(|error| PartialUpsert { written_ids: Vec::new(), error })?
        };

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
            if chunk.id.is_empty() {
                chunk.id = Uuid::new_v4().to_string();
            }
        }
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();

        self.store.upsert(&self.collection, &chunks).await?;

        debug!(collection = %self.collection, count = ids.len(), "upserted chunks");
        Ok(ids)
    }

    /// Best-effort removal of records by id, used as compensation.
    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.delete(&self.collection, ids).await
    }

    /// Embed the query and return at most `top_k` results with
    /// `score >= score_threshold`, ordered by descending score.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&self.collection, &embedding, top_k).await?;

        let filtered: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= score_threshold).collect();

        debug!(
            collection = %self.collection,
            result_count = filtered.len(),
            "search completed"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::inmemory::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Deterministic embedder: maps known words onto axes of a 3-dim space.
    struct AxisEmbedder {
        dimensions: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 3];
            if text.contains("retention") {
                v[0] = 1.0;
            }
            if text.contains("audit") {
                v[1] = 1.0;
            }
            if text.contains("penalty") {
                v[2] = 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    fn chunk_from(doc: &Document, text: &str) -> Chunk {
        Chunk {
            id: String::new(),
            text: text.to_string(),
            embedding: Vec::new(),
            metadata: HashMap::new(),
            document_id: doc.id.clone(),
        }
    }

    fn gateway_with(dimensions: usize) -> (VectorGateway, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new());
        let gateway = VectorGateway::new(
            Arc::new(AxisEmbedder { dimensions }),
            store.clone(),
            "regnav-documents",
        );
        (gateway, store)
    }

    #[tokio::test]
    async fn zero_dimensionality_is_a_provisioning_error() {
        let (gateway, _) = gateway_with(0);
        assert!(matches!(
            gateway.ensure_collection().await,
            Err(RagError::Provisioning(_))
        ));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_a_provisioning_error() {
        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_collection("regnav-documents", 768).await.unwrap();

        let gateway = VectorGateway::new(
            Arc::new(AxisEmbedder { dimensions: 3 }),
            store,
            "regnav-documents",
        );
        let err = gateway.ensure_collection().await.unwrap_err();
        assert!(matches!(err, RagError::Provisioning(_)));
        assert!(err.to_string().contains("768"));
    }

    #[tokio::test]
    async fn upsert_assigns_fresh_uuid_ids() {
        let (gateway, _) = gateway_with(3);
        gateway.ensure_collection().await.unwrap();

        let doc = Document::new("doc_1", "");
        let ids = gateway
            .upsert(vec![
                chunk_from(&doc, "retention period is five years"),
                chunk_from(&doc, "audits occur annually"),
            ])
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        for id in &ids {
            assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
        }
    }

    #[tokio::test]
    async fn round_trip_upsert_then_search_finds_the_chunk() {
        let (gateway, _) = gateway_with(3);
        gateway.ensure_collection().await.unwrap();

        let doc = Document::new("doc_1", "");
        let ids = gateway
            .upsert(vec![
                chunk_from(&doc, "the retention period is five years"),
                chunk_from(&doc, "penalty schedules are published quarterly"),
            ])
            .await
            .unwrap();

        let results = gateway.search("what is the retention period?", 5, 0.5).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.id, ids[0]);
    }

    #[tokio::test]
    async fn search_filters_below_threshold_and_caps_at_k() {
        let (gateway, _) = gateway_with(3);
        gateway.ensure_collection().await.unwrap();

        let doc = Document::new("doc_1", "");
        gateway
            .upsert(vec![
                chunk_from(&doc, "retention rules"),
                chunk_from(&doc, "more retention rules"),
                chunk_from(&doc, "penalty only"),
            ])
            .await
            .unwrap();

        let results = gateway.search("retention", 1, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score >= 0.5);

        // An orthogonal query clears nothing.
        let results = gateway.search("unrelated topic", 5, 0.5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_by_ids_removes_records() {
        let (gateway, store) = gateway_with(3);
        gateway.ensure_collection().await.unwrap();

        let doc = Document::new("doc_1", "");
        let ids = gateway
            .upsert(vec![
                chunk_from(&doc, "retention"),
                chunk_from(&doc, "audit"),
            ])
            .await
            .unwrap();

        gateway.delete_by_ids(&ids).await.unwrap();
        assert!(store.is_empty("regnav-documents").await);
    }
}
