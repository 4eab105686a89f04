//! OpenAI-backed embedding provider and chat model.
//!
//! Both clients call the OpenAI REST API directly with `reqwest`; the
//! `base_url` override makes them work against OpenAI-compatible servers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::model::{ChatMessage, ChatModel};

/// The default OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The dimensionality of `text-embedding-3-small`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

fn embedding_err(message: impl Into<String>) -> RagError {
    RagError::Embedding { provider: "OpenAI".into(), message: message.into() }
}

fn model_err(message: impl Into<String>) -> RagError {
    RagError::Model { provider: "OpenAI".into(), message: message.into() }
}

/// Parse the `error.message` detail out of an OpenAI error body, falling
/// back to the raw body.
fn error_detail(body: String) -> String {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key and the default model
    /// (`text-embedding-3-small`, 1536 dimensions).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(embedding_err("API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Set the embedding model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensionality (Matryoshka truncation).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Override the API base URL (for OpenAI-compatible servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_err("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                embedding_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(%status, "embeddings API error");
            return Err(embedding_err(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| embedding_err(format!("failed to parse response: {e}")))?;

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// Non-streaming: the full completion is requested in one call and the
/// first choice's content is returned verbatim.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIChatModel {
    /// Create a new chat model client.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(model_err("API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: model.into(),
        })
    }

    /// Override the API base URL (for OpenAI-compatible servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn generate(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        debug!(model = %self.model, message_count = messages.len(), "chat completion request");

        let request_body = ChatRequest { model: &self.model, messages, temperature };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "chat completion request failed");
                model_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(%status, "chat completions API error");
            return Err(model_err(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| model_err(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| model_err("API returned no completion"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
