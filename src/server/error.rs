//! HTTP Error Mapping
//!
//! Turns [`LingoError`] values into the `{"success": false, "error": ...}`
//! envelope the frontend expects. Validation problems are 400, missing
//! rows are 404, everything else is a 500 with the detail kept out of the
//! response body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::types::LingoError;

impl IntoResponse for LingoError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LingoError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LingoError::DuplicateWord(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            LingoError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            other => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({"success": false, "error": message}))).into_response()
    }
}
