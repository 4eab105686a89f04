//! Shared application state handed to route handlers.

use std::path::PathBuf;
use std::sync::Arc;

use regnav_rag::{IngestionPipeline, RagResponder};

/// Everything the handlers need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub responder: Arc<RagResponder>,
    pub upload_dir: PathBuf,
}
