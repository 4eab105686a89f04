//! Ingestion pipeline: load → chunk → embed → upsert.
//!
//! A mid-batch upsert failure triggers a compensating delete of the ids
//! already written, and the whole load-chunk-embed-upsert sequence is
//! retried under an explicit [`RetryPolicy`] — ids are freshly generated
//! on every attempt, so retrying the whole sequence is safe.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::gateway::VectorGateway;
use crate::loader::DocumentLoader;

/// Bounded-attempt retry with exponential backoff.
///
/// Applied imperatively by [`IngestionPipeline::ingest_with_retry`] so the
/// retry contract is visible at the call site. Only errors for which
/// [`RagError::is_retryable`] holds are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget (first try included).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_secs(1), multiplier: 1.5 }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.mul_f64(self.multiplier.powi(attempt.saturating_sub(1) as i32))
    }
}

/// Orchestrates document ingestion into the vector store.
pub struct IngestionPipeline {
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    gateway: Arc<VectorGateway>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Run one ingest attempt: load → chunk → embed → upsert.
    ///
    /// On a partial upsert failure the ids already written are deleted
    /// before the error surfaces as [`RagError::Ingestion`]; a failed
    /// compensating delete is logged but never masks the original error.
    pub async fn ingest(&self, path: &Path) -> Result<()> {
        let documents = self.loader.load(path).await?;

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            chunks.extend(self.chunker.chunk(document));
        }
        if chunks.is_empty() {
            info!(path = %path.display(), chunk_count = 0, "ingested document (empty)");
            return Ok(());
        }
        let chunk_count = chunks.len();

        match self.gateway.upsert(chunks).await {
            Ok(ids) => {
                info!(path = %path.display(), chunk_count = ids.len(), "ingested document");
                Ok(())
            }
            Err(partial) => {
                error!(
                    path = %path.display(),
                    written = partial.written_ids.len(),
                    total = chunk_count,
                    error = %partial.error,
                    "upsert failed, compensating"
                );
                if !partial.written_ids.is_empty() {
                    if let Err(e) = self.gateway.delete_by_ids(&partial.written_ids).await {
                        warn!(error = %e, "compensating delete failed");
                    }
                }
                Err(RagError::Ingestion(format!(
                    "upsert failed for '{}': {}",
                    path.display(),
                    partial.error
                )))
            }
        }
    }

    /// Ingest with the configured retry budget.
    ///
    /// Retries the whole load-chunk-embed-upsert sequence on retryable
    /// errors; a load failure surfaces on the first attempt.
    pub async fn ingest_with_retry(&self, path: &Path) -> Result<()> {
        let mut attempt = 1u32;
        loop {
            match self.ingest(path).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "ingestion attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The retry policy in effect.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Builder for constructing an [`IngestionPipeline`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
    gateway: Option<Arc<VectorGateway>>,
    retry: Option<RetryPolicy>,
}

impl IngestionPipelineBuilder {
    /// Set the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the vector store gateway.
    pub fn gateway(mut self, gateway: Arc<VectorGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Override the default retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the pipeline, validating that all required fields are set.
    pub fn build(self) -> Result<IngestionPipeline> {
        let loader =
            self.loader.ok_or_else(|| RagError::Config("loader is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::Config("chunker is required".to_string()))?;
        let gateway =
            self.gateway.ok_or_else(|| RagError::Config("gateway is required".to_string()))?;

        Ok(IngestionPipeline { loader, chunker, gateway, retry: self.retry.unwrap_or_default() })
    }
}
