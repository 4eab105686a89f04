//! Retrieval-augmented responder.
//!
//! Single-shot retrieve-then-generate: similarity search, context
//! assembly, prompt render, one language-model call. Query-time failures
//! surface immediately — there is no retry here, by contrast with the
//! ingestion pipeline.

use std::sync::Arc;

use tracing::info;

use crate::error::{RagError, Result};
use crate::gateway::VectorGateway;
use crate::model::ChatModel;
use crate::prompt::PromptStore;

/// Number of chunks retrieved per query.
pub const TOP_K: usize = 5;

/// Minimum similarity score for a chunk to enter the context.
pub const SCORE_THRESHOLD: f32 = 0.5;

/// Sampling temperature for the language model.
pub const TEMPERATURE: f32 = 0.1;

/// Answers natural-language queries against the ingested collection.
pub struct RagResponder {
    gateway: Arc<VectorGateway>,
    prompts: Arc<PromptStore>,
    model: Arc<dyn ChatModel>,
    prompt_name: String,
}

impl RagResponder {
    /// Create a responder bound to a fixed prompt name.
    pub fn new(
        gateway: Arc<VectorGateway>,
        prompts: Arc<PromptStore>,
        model: Arc<dyn ChatModel>,
        prompt_name: impl Into<String>,
    ) -> Self {
        Self { gateway, prompts, model, prompt_name: prompt_name.into() }
    }

    /// Answer a query with retrieved context.
    ///
    /// Fails with [`RagError::EmptyQuery`] on blank input before any
    /// search or model call. When no chunk clears the score threshold the
    /// model is still invoked with an empty context string. The model's
    /// text output is returned verbatim.
    pub async fn answer(&self, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let results = self.gateway.search(query, TOP_K, SCORE_THRESHOLD).await?;

        // Descending-score order is preserved from the search.
        let context: String = results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let messages = self.prompts.build_messages(&self.prompt_name, query, &context, None)?;
        let answer = self.model.generate(&messages, TEMPERATURE).await?;

        info!(
            prompt = %self.prompt_name,
            context_chunks = results.len(),
            model = self.model.name(),
            "answered query"
        );
        Ok(answer)
    }
}
