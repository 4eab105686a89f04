//! Document loading.
//!
//! PDF files go through `pdf-extract` on a blocking thread, with pages
//! split on form feeds; anything else is read as UTF-8 text. A loader
//! failure is terminal for the ingest attempt (no partial state exists
//! yet, nothing to clean up).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Loads a file into one or more [`Document`]s.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load the file at `path`.
    ///
    /// Paginated sources produce one document per page with a `page`
    /// metadata entry (1-based). All documents carry a `source` entry
    /// with the file name.
    async fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// The filesystem-backed [`DocumentLoader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDocumentLoader;

#[async_trait]
impl DocumentLoader for FileDocumentLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());

        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            load_pdf(path, &source, &stem).await
        } else {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                RagError::DocumentLoad(format!("cannot read '{source}': {e}"))
            })?;
            let mut metadata = HashMap::new();
            metadata.insert("source".to_string(), source);
            Ok(vec![Document { id: stem, text, metadata }])
        }
    }
}

async fn load_pdf(path: &Path, source: &str, stem: &str) -> Result<Vec<Document>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::DocumentLoad(format!("cannot read '{source}': {e}")))?;

    // pdf-extract is synchronous; keep it off the async runtime.
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| RagError::DocumentLoad(format!("extraction task failed: {e}")))?
        .map_err(|e| RagError::DocumentLoad(format!("cannot parse '{source}': {e}")))?;

    if text.trim().is_empty() {
        warn!(source, "no text extracted from PDF, possibly a scanned document");
    }

    // Pages separated by form feeds; a PDF without them is one page.
    let pages: Vec<&str> = {
        let split: Vec<&str> = text.split('\x0c').filter(|p| !p.trim().is_empty()).collect();
        if split.is_empty() { vec![text.as_str()] } else { split }
    };

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, page_text)| {
            let page = i + 1;
            let mut metadata = HashMap::new();
            metadata.insert("source".to_string(), source.to_string());
            metadata.insert("page".to_string(), page.to_string());
            Document {
                id: format!("{stem}_p{page}"),
                text: page_text.to_string(),
                metadata,
            }
        })
        .collect())
}
