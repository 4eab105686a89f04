//! Ingestion pipeline integration tests with fake seams: compensation on
//! partial upsert, retry budget, and load-failure behavior.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regnav_rag::document::{Chunk, Document, SearchResult};
use regnav_rag::embedding::EmbeddingProvider;
use regnav_rag::error::{RagError, Result};
use regnav_rag::ingest::{IngestionPipeline, RetryPolicy};
use regnav_rag::inmemory::InMemoryVectorStore;
use regnav_rag::loader::DocumentLoader;
use regnav_rag::vectorstore::{PartialUpsert, VectorStore};
use regnav_rag::{Chunker, VectorGateway};

const COLLECTION: &str = "regnav-documents";

/// One chunk per non-empty line; keeps batch sizes predictable.
struct LineChunker;

impl Chunker for LineChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        document
            .text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: String::new(),
                    text: line.to_string(),
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

/// Constant-vector embedder; ingestion tests don't exercise similarity.
struct FlatEmbedder;

#[async_trait]
impl EmbeddingProvider for FlatEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Wraps an [`InMemoryVectorStore`] and fails upserts on command.
///
/// `fail_at_chunk`: writes chunks before that index into the inner store,
/// then reports a [`PartialUpsert`] with the written ids. `fail_calls`:
/// rejects that many whole upsert calls (nothing written) before letting
/// calls through.
struct FaultyStore {
    inner: InMemoryVectorStore,
    fail_at_chunk: Option<usize>,
    fail_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    deleted_ids: std::sync::Mutex<Vec<String>>,
}

impl FaultyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            fail_at_chunk: None,
            fail_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            deleted_ids: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn failing_at_chunk(index: usize) -> Self {
        Self { fail_at_chunk: Some(index), ..Self::new() }
    }

    fn failing_first_calls(count: usize) -> Self {
        let store = Self::new();
        store.fail_calls.store(count, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl VectorStore for FaultyStore {
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.ensure_collection(name, dimensions).await
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>> {
        self.inner.collection_dimensions(name).await
    }

    async fn upsert(
        &self,
        collection: &str,
        chunks: &[Chunk],
    ) -> std::result::Result<(), PartialUpsert> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .fail_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PartialUpsert {
                written_ids: Vec::new(),
                error: RagError::VectorStore {
                    backend: "faulty".into(),
                    message: "transient write failure".into(),
                },
            });
        }

        if let Some(fail_index) = self.fail_at_chunk {
            if chunks.len() > fail_index {
                let written = &chunks[..fail_index];
                self.inner.upsert(collection, written).await?;
                return Err(PartialUpsert {
                    written_ids: written.iter().map(|c| c.id.clone()).collect(),
                    error: RagError::VectorStore {
                        backend: "faulty".into(),
                        message: format!("write failed at chunk {fail_index}"),
                    },
                });
            }
        }

        self.inner.upsert(collection, chunks).await
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        self.deleted_ids.lock().unwrap().extend(ids.iter().cloned());
        self.inner.delete(collection, ids).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.inner.search(collection, embedding, top_k).await
    }
}

/// Counts load calls, then fails every one of them.
struct BrokenLoader {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentLoader for BrokenLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::DocumentLoad(format!("cannot read '{}'", path.display())))
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { max_attempts, base_delay: Duration::from_millis(1), multiplier: 1.5 }
}

fn write_lines(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

async fn pipeline_over(store: Arc<FaultyStore>, retry: RetryPolicy) -> IngestionPipeline {
    store.ensure_collection(COLLECTION, 2).await.unwrap();
    let gateway = Arc::new(VectorGateway::new(Arc::new(FlatEmbedder), store, COLLECTION));
    IngestionPipeline::builder()
        .loader(Arc::new(regnav_rag::FileDocumentLoader))
        .chunker(Arc::new(LineChunker))
        .gateway(gateway)
        .retry(retry)
        .build()
        .unwrap()
}

#[tokio::test]
async fn mid_batch_failure_compensates_written_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_lines(&dir, "doc.txt", &["one", "two", "three", "four", "five"]);

    // Fails writing the 3rd of 5 chunks; chunks 1-2 land in the store.
    let store = Arc::new(FaultyStore::failing_at_chunk(2));
    let pipeline = pipeline_over(store.clone(), fast_retry(1)).await;

    let err = pipeline.ingest(&path).await.unwrap_err();
    assert!(matches!(err, RagError::Ingestion(_)), "unexpected error: {err}");

    // Exactly the two written ids were compensated, and nothing remains.
    let deleted = store.deleted_ids.lock().unwrap().clone();
    assert_eq!(deleted.len(), 2);
    assert_eq!(store.inner.len(COLLECTION).await, 0);
}

#[tokio::test]
async fn transient_failures_are_retried_within_budget() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_lines(&dir, "doc.txt", &["alpha", "beta"]);

    let store = Arc::new(FaultyStore::failing_first_calls(2));
    let pipeline = pipeline_over(store.clone(), fast_retry(5)).await;

    pipeline.ingest_with_retry(&path).await.unwrap();
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.inner.len(COLLECTION).await, 2);
}

#[tokio::test]
async fn exhausted_budget_surfaces_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_lines(&dir, "doc.txt", &["alpha"]);

    let store = Arc::new(FaultyStore::failing_first_calls(usize::MAX));
    let pipeline = pipeline_over(store.clone(), fast_retry(3)).await;

    let err = pipeline.ingest_with_retry(&path).await.unwrap_err();
    assert!(matches!(err, RagError::Ingestion(_)));
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn load_failure_is_not_retried() {
    let store = Arc::new(FaultyStore::new());
    store.ensure_collection(COLLECTION, 2).await.unwrap();
    let gateway = Arc::new(VectorGateway::new(Arc::new(FlatEmbedder), store.clone(), COLLECTION));

    let loader = Arc::new(BrokenLoader { calls: AtomicUsize::new(0) });
    let pipeline = IngestionPipeline::builder()
        .loader(loader.clone())
        .chunker(Arc::new(LineChunker))
        .gateway(gateway)
        .retry(fast_retry(5))
        .build()
        .unwrap();

    let err = pipeline.ingest_with_retry(Path::new("corrupt.pdf")).await.unwrap_err();
    assert!(matches!(err, RagError::DocumentLoad(_)));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ids_are_regenerated_on_each_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_lines(&dir, "doc.txt", &["one", "two", "three"]);

    // First call fails after writing chunk 1; retry succeeds in full.
    let store = Arc::new(FaultyStore::failing_first_calls(1));
    let pipeline = pipeline_over(store.clone(), fast_retry(2)).await;

    pipeline.ingest_with_retry(&path).await.unwrap();
    assert_eq!(store.inner.len(COLLECTION).await, 3);
}

#[tokio::test]
async fn empty_document_ingests_without_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_lines(&dir, "empty.txt", &[]);

    let store = Arc::new(FaultyStore::new());
    let pipeline = pipeline_over(store.clone(), fast_retry(1)).await;

    pipeline.ingest(&path).await.unwrap();
    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), 0);
}
