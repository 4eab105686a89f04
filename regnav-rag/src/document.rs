//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
///
/// For paginated sources (PDF) the loader produces one `Document` per page,
/// with the page number recorded in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier for the document (derived from the source file).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with the given id and text and no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }
}

/// A segment of a [`Document`] destined for the vector store.
///
/// Chunks come out of the chunker with an empty `id` and an empty
/// `embedding`; the gateway fills both in during upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Point identifier in the vector store (UUID, assigned at upsert).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The id of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
