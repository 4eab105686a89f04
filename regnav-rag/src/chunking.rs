//! Document chunking.
//!
//! Provides the [`Chunker`] trait and [`RecursiveChunker`], which splits
//! text at natural boundaries (paragraphs, then sentences, then words)
//! before falling back to hard character cuts, carrying a configurable
//! overlap between adjacent chunks.

use crate::document::{Chunk, Document};

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Boundary hierarchy tried before hard character cuts.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations are pure: the same document and configuration always
/// yield the same chunk sequence. Returned chunks carry no embedding and
/// no id; both are assigned by the gateway during upsert.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → sentences → words → characters.
///
/// Segments are merged up to `chunk_size`; when a chunk is closed, the next
/// chunk is seeded with the trailing `chunk_overlap` characters of its
/// predecessor so context survives the boundary. At the hard-cut level the
/// overlap is exact; at natural-boundary levels it is floored to a UTF-8
/// character boundary.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        debug_assert!(chunk_overlap < chunk_size);
        Self { chunk_size, chunk_overlap }
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let raw_chunks =
            split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS);

        raw_chunks
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: String::new(),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

/// Split text by the first separator, then merge segments into chunks that
/// respect `chunk_size`. Oversized pieces are split further with the
/// next-level separator, bottoming out in hard character cuts.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, remaining)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    // Whether `current` holds anything beyond the seeded overlap; a chunk
    // must never consist purely of its predecessor's tail.
    let mut fresh = false;

    for segment in split_keeping_separator(text, separator) {
        if current.len() + segment.len() > chunk_size && !current.is_empty() {
            if fresh {
                let seed = overlap_tail(&current, chunk_overlap).to_string();
                flush(
                    &mut chunks,
                    std::mem::take(&mut current),
                    chunk_size,
                    chunk_overlap,
                    remaining,
                );
                current = seed;
            } else {
                // The seed alone plus this segment would overflow; drop the
                // seed rather than emit a duplicate-only chunk.
                current.clear();
            }
            fresh = false;
        }
        current.push_str(segment);
        fresh = true;
    }

    if fresh {
        flush(&mut chunks, current, chunk_size, chunk_overlap, remaining);
    }

    chunks
}

/// Push a completed piece, recursing with the next separator level if it
/// still exceeds `chunk_size`.
fn flush(
    chunks: &mut Vec<String>,
    piece: String,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) {
    if piece.len() > chunk_size {
        chunks.extend(split_and_merge(&piece, chunk_size, chunk_overlap, separators));
    } else {
        chunks.push(piece);
    }
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment, so no characters are lost across chunks.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        segments.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Hard character cuts with exact overlap between consecutive chunks.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }

        let mut next = start + step;
        while next < text.len() && !text.is_char_boundary(next) {
            next += 1;
        }
        start = next;
    }

    chunks
}

/// The trailing `overlap` characters of `s`, floored to a UTF-8 boundary.
fn overlap_tail(s: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    if s.len() <= overlap {
        return s;
    }
    let mut start = s.len() - overlap;
    while start > 0 && !s.is_char_boundary(start) {
        start -= 1;
    }
    &s[start..]
}
