//! Error types for the `regnav-rag` crate.

use thiserror::Error;

/// Errors that can occur in the ingestion and retrieval pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error: malformed prompt definitions,
    /// missing or dangling stable-version pointers, invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source document could not be read or parsed.
    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    /// Embedding or upsert failed during ingestion, after a compensating
    /// delete of any partially written records was attempted.
    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    /// Collection provisioning failed, including embedding-dimensionality
    /// problems detected at startup.
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// The caller supplied a blank query.
    #[error("Query must not be empty")]
    EmptyQuery,

    /// An error from the embedding backend.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error from the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error from the language model backend.
    #[error("Model error ({provider}): {message}")]
    Model {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether the whole ingest operation may be retried after this error.
    ///
    /// Only [`RagError::Ingestion`] qualifies: load failures are terminal
    /// and configuration or provisioning problems will not fix themselves
    /// between attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RagError::Ingestion(_))
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
