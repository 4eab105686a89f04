//! regnav HTTP server: document upload and retrieval-augmented chat.

mod config;
mod response;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use regnav_rag::{
    FileDocumentLoader, IngestionPipeline, OpenAIChatModel, OpenAIEmbeddingProvider, PromptStore,
    QdrantVectorStore, RagResponder, RecursiveChunker, VectorGateway,
};

use config::ServerConfig;
use state::AppState;

/// Largest accepted upload body: 25 MiB.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();

    let embedder = Arc::new(
        OpenAIEmbeddingProvider::new(config.openai_api_key.clone())
            .context("invalid OpenAI credentials")?
            .with_model(&config.embeddings_model),
    );
    let store = Arc::new(
        QdrantVectorStore::new(&config.qdrant_url).context("failed to build Qdrant client")?,
    );
    let gateway = Arc::new(VectorGateway::new(embedder, store, &config.collection_name));
    gateway
        .ensure_collection()
        .await
        .with_context(|| format!("failed to provision collection '{}'", config.collection_name))?;

    let pipeline = Arc::new(
        IngestionPipeline::builder()
            .loader(Arc::new(FileDocumentLoader))
            .chunker(Arc::new(RecursiveChunker::default()))
            .gateway(gateway.clone())
            .build()?,
    );

    let model = Arc::new(
        OpenAIChatModel::new(config.openai_api_key.clone(), &config.llm_model)
            .context("invalid OpenAI credentials")?,
    );
    let prompts = Arc::new(PromptStore::new(&config.prompt_dir));
    let responder = Arc::new(RagResponder::new(gateway, prompts, model, "regulatory"));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create '{}'", config.upload_dir.display()))?;

    let app = routes::router(AppState {
        pipeline,
        responder,
        upload_dir: config.upload_dir.clone(),
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    // tower-http enforces the body limit; axum's built-in 2 MiB default
    // would otherwise reject large uploads first.
    .layer(axum::extract::DefaultBodyLimit::disable())
    .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    info!(%addr, collection = %config.collection_name, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutting down");
}
