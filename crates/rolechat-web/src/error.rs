//! Web error types and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use rolechat_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    // -- Request errors ------------------------------------------------------
    /// The request body or query was missing something required.
    #[error("bad request: {0}")]
    BadRequest(String),

    // -- Upstream crate errors -----------------------------------------------
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    // -- Server errors -------------------------------------------------------
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WebError>;

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
