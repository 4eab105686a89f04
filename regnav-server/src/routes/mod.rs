//! HTTP routes, all nested under `/api/v1`.

mod chat;
mod health;
mod upload;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/upload", post(upload::upload))
        .route("/chat", post(chat::chat));

    Router::new().nest("/api/v1", api).with_state(state)
}
