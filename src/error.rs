use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::conversation::ValidationError;

/// Failures raised by a provider adapter.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{var} environment variable is not set")]
    MissingCredential { var: &'static str },

    #[error("request to provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),
}

/// Errors surfaced by the `/chat` endpoint.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    Payload(String),

    #[error("{0}")]
    Config(String),

    #[error("Server error: {0}")]
    Upstream(String),
}

impl From<ProviderError> for ChatError {
    fn from(err: ProviderError) -> Self {
        match &err {
            ProviderError::MissingCredential { .. } => ChatError::Config(err.to_string()),
            _ => ChatError::Upstream(err.to_string()),
        }
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Invalid(_) | ChatError::Payload(_) => StatusCode::BAD_REQUEST,
            ChatError::Config(_) | ChatError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
