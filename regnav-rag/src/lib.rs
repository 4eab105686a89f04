//! # regnav-rag
//!
//! Core ingestion and retrieval pipeline for the regnav regulatory
//! document backend.
//!
//! ## Overview
//!
//! - [`PromptStore`] — versioned prompt definitions with a `stable`
//!   pointer per role, rendered with literal `$context`/`$query`
//!   substitution.
//! - [`RecursiveChunker`] — paragraph → sentence → word → character
//!   splitting with overlap.
//! - [`VectorGateway`] — owns the embedding model and the vector index;
//!   collection provisioning, batch upsert with partial-write reporting,
//!   delete-by-id, threshold-filtered similarity search.
//! - [`IngestionPipeline`] — load → chunk → embed → upsert with
//!   compensating delete and a bounded-backoff [`RetryPolicy`].
//! - [`RagResponder`] — search → context assembly → prompt render →
//!   language-model call.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use regnav_rag::{
//!     IngestionPipeline, OpenAIChatModel, OpenAIEmbeddingProvider, PromptStore,
//!     QdrantVectorStore, RagResponder, RecursiveChunker, VectorGateway,
//! };
//!
//! let embedder = Arc::new(OpenAIEmbeddingProvider::new(api_key)?);
//! let store = Arc::new(QdrantVectorStore::new("http://localhost:6334")?);
//! let gateway = Arc::new(VectorGateway::new(embedder, store, "regnav-documents"));
//! gateway.ensure_collection().await?;
//!
//! let pipeline = IngestionPipeline::builder()
//!     .loader(Arc::new(regnav_rag::FileDocumentLoader))
//!     .chunker(Arc::new(RecursiveChunker::default()))
//!     .gateway(gateway.clone())
//!     .build()?;
//! pipeline.ingest_with_retry(path).await?;
//!
//! let responder = RagResponder::new(
//!     gateway,
//!     Arc::new(PromptStore::new("prompts")),
//!     Arc::new(OpenAIChatModel::new(api_key, "gpt-4o-mini")?),
//!     "regulatory",
//! );
//! let answer = responder.answer("What is the retention period?").await?;
//! ```

pub mod chunking;
pub mod document;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod inmemory;
pub mod loader;
pub mod model;
pub mod openai;
pub mod prompt;
pub mod qdrant;
pub mod responder;
pub mod vectorstore;

pub use chunking::{Chunker, RecursiveChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use gateway::VectorGateway;
pub use ingest::{IngestionPipeline, IngestionPipelineBuilder, RetryPolicy};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, FileDocumentLoader};
pub use model::{ChatMessage, ChatModel, MessageRole};
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
pub use prompt::{PromptDefinition, PromptRole, PromptStore};
pub use qdrant::QdrantVectorStore;
pub use responder::RagResponder;
pub use vectorstore::{PartialUpsert, VectorStore};
