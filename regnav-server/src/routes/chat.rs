use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub query: String,
}

/// Answer a question from the indexed documents.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<ApiResponse<Value>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::bad_request("Missing query parameter"));
    }

    let answer = state.responder.answer(&body.query).await?;
    Ok(ApiResponse::create(StatusCode::OK, Some(json!({ "answer": answer })), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_query_defaults_to_empty() {
        let body: ChatBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.query, "");
    }

    #[test]
    fn query_is_deserialized() {
        let body: ChatBody =
            serde_json::from_str(r#"{"query": "what is the retention period?"}"#).unwrap();
        assert_eq!(body.query, "what is the retention period?");
    }
}
