//! Response envelope and error mapping for the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regnav_rag::RagError;
use serde::Serialize;

/// The API response envelope: `{status_code, success, message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Build an envelope; `success` derives from the status code and the
    /// message defaults to "Success".
    pub fn create(status: StatusCode, data: Option<T>, message: Option<&str>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: status.as_u16() < 400,
            message: message.unwrap_or("Success").to_string(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// A boundary error carrying an HTTP status and a descriptive message.
///
/// Core errors keep their message detail; nothing is swallowed on the way
/// out.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// A client error (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    /// A server error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = match err {
            RagError::EmptyQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::create(self.status, None, Some(&self.message)).into_response()
    }
}
