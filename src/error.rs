use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error as _;
use thiserror::Error;

/// Application-specific errors
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid API key")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to callers: names the failing category and
    /// configuration key, never URLs, credentials or parser internals.
    fn public_message(&self) -> String {
        match self {
            ProxyError::Unauthorized => {
                "Invalid API key. Use one of the keys configured for this router.".to_string()
            }
            ProxyError::Config(_) => self.to_string(),
            ProxyError::InvalidBody(_) => "Request body is not valid JSON".to_string(),
            ProxyError::Http(_) => "Failed to reach the upstream API".to_string(),
            ProxyError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// The error followed by its `source()` chain, one cause per line.
    fn stack(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = self.source();
        while let Some(cause) = source {
            lines.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        lines.join("\n")
    }

    /// Builds the JSON error response. With `expose_details` the full message
    /// and the cause chain are included, otherwise only the public message.
    pub fn into_response_with_details(self, expose_details: bool) -> Response {
        let status = self.status();

        if matches!(self, ProxyError::Unauthorized) {
            tracing::warn!("Rejected request with invalid API key");
            let body = Json(json!({
                "error": {
                    "message": self.public_message(),
                    "type": "invalid_request_error",
                    "code": "invalid_api_key",
                }
            }));
            return (status, body).into_response();
        }

        tracing::error!("Error processing request: {}", self.stack());

        let body = if expose_details {
            json!({
                "error": {
                    "message": self.to_string(),
                    "stack": self.stack(),
                    "type": "server_error",
                }
            })
        } else {
            json!({
                "error": {
                    "message": self.public_message(),
                    "type": "server_error",
                }
            })
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.into_response_with_details(false)
    }
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
