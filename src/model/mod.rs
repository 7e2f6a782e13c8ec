mod gemini;
mod groq;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

use async_trait::async_trait;
use log::debug;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};
use crate::conversation::Conversation;
use crate::error::ProviderError;

/// A remote LLM that can continue a conversation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Asks the provider for the next assistant turn. Makes exactly one
    /// outbound request.
    async fn generate(&self, persona: &str, conversation: &Conversation) -> Result<String, ProviderError>;
}

pub fn build_provider(config: &ProviderConfig) -> Arc<dyn ChatProvider> {
    match config.kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(config.clone())),
        ProviderKind::Groq => Arc::new(GroqProvider::new(config.clone())),
    }
}

fn require_key(config: &ProviderConfig) -> Result<&str, ProviderError> {
    config
        .api_key
        .as_deref()
        .ok_or(ProviderError::MissingCredential {
            var: config.kind.credential_var(),
        })
}

/// Sends a prepared request and returns the decoded JSON body, turning
/// non-2xx statuses into [`ProviderError::Status`].
async fn send_json(request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body: Value = response.json().await?;
    debug!("Response JSON: {}", body);
    Ok(body)
}
