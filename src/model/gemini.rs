use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{require_key, send_json, ChatProvider};
use crate::config::ProviderConfig;
use crate::conversation::{Conversation, Message, Role};
use crate::error::ProviderError;

#[derive(Debug, Serialize, PartialEq)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Gemini `generateContent` client. Earlier turns are sent as chat history
/// with the persona as the system instruction, and the pending user turn
/// goes last.
pub struct GeminiProvider {
    config: ProviderConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        info!("Using Gemini model {} at {}", config.model, config.base_url);
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn build_request<'a>(&self, persona: &'a str, conversation: &'a Conversation) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content<'a>> = conversation.history().iter().map(to_content).collect();
        contents.push(to_content(conversation.pending()));

        let generation_config = if self.config.temperature.is_some() || self.config.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part { text: persona }],
            },
            generation_config,
        }
    }
}

// Gemini calls the assistant side "model".
fn to_content(message: &Message) -> Content<'_> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    Content {
        role,
        parts: vec![Part {
            text: &message.content,
        }],
    }
}

fn extract_reply(body: &Value) -> Result<String, ProviderError> {
    let parts = body
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array());

    let Some(parts) = parts else {
        let reason = body
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(|reason| reason.as_str());
        return Err(ProviderError::MalformedResponse(match reason {
            Some(reason) => format!("prompt blocked: {}", reason),
            None => "no candidates in response".to_string(),
        }));
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
        .collect();
    if text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "candidate has no text parts".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, persona: &str, conversation: &Conversation) -> Result<String, ProviderError> {
        let api_key = require_key(&self.config)?;
        let payload = self.build_request(persona, conversation);
        debug!("Gemini payload: {:?}", payload);

        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload);
        let body = send_json(request).await?;
        extract_reply(&body)
    }
}
