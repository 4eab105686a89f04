//! Environment-based server configuration.

use std::path::PathBuf;

/// Server configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port.
    pub port: u16,
    /// OpenAI API key, required for embeddings and chat completions.
    pub openai_api_key: String,
    /// Qdrant gRPC endpoint.
    pub qdrant_url: String,
    /// Chat model identifier.
    pub llm_model: String,
    /// Embedding model identifier.
    pub embeddings_model: String,
    /// Vector store collection name.
    pub collection_name: String,
    /// Directory for uploaded temporary artifacts.
    pub upload_dir: PathBuf,
    /// Directory holding prompt definition files.
    pub prompt_dir: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", "5000").parse().unwrap_or(5000),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            qdrant_url: env_or("QDRANT_DB_URL", "http://localhost:6334"),
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            embeddings_model: env_or("EMBEDDINGS_MODEL", "text-embedding-3-small"),
            collection_name: env_or("COLLECTION_NAME", "regnav-documents"),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "public/tmp")),
            prompt_dir: PathBuf::from(env_or("PROMPT_DIR", "prompts")),
        }
    }
}
