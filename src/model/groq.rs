use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{require_key, send_json, ChatProvider};
use crate::config::ProviderConfig;
use crate::conversation::Conversation;
use crate::error::ProviderError;

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Groq's OpenAI-compatible chat completions client. The persona is sent as
/// a leading system message followed by the whole conversation.
pub struct GroqProvider {
    config: ProviderConfig,
    client: Client,
}

impl GroqProvider {
    pub fn new(config: ProviderConfig) -> Self {
        info!("Using Groq model {} at {}", config.model, config.base_url);
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn build_request<'a>(&'a self, persona: &'a str, conversation: &'a Conversation) -> ChatCompletionRequest<'a> {
        let messages = std::iter::once(ChatMessage {
            role: "system",
            content: persona,
        })
        .chain(conversation.iter().map(|message| ChatMessage {
            role: message.role.as_str(),
            content: &message.content,
        }))
        .collect();

        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

fn extract_reply(body: &Value) -> Result<String, ProviderError> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MalformedResponse("no message content in first choice".to_string()))
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn generate(&self, persona: &str, conversation: &Conversation) -> Result<String, ProviderError> {
        let api_key = require_key(&self.config)?;
        let payload = self.build_request(persona, conversation);
        debug!("Groq payload: {:?}", payload);

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload);
        let body = send_json(request).await?;
        extract_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use serde_json::json;

    #[test]
    fn prepends_persona_as_system_message() {
        let mut config = ProviderConfig::new(ProviderKind::Groq, None);
        config.temperature = Some(0.5);
        let provider = GroqProvider::new(config);
        let conversation = Conversation::from_json(&json!({"messages": [
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hey"},
            {"role": "user", "content": "Bye"}
        ]}))
        .unwrap();

        let value = serde_json::to_value(provider.build_request("persona", &conversation)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hey"},
                    {"role": "user", "content": "Bye"}
                ],
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn reads_first_choice() {
        let body = json!({"choices": [
            {"message": {"role": "assistant", "content": "first"}},
            {"message": {"role": "assistant", "content": "second"}}
        ]});
        assert_eq!(extract_reply(&body).unwrap(), "first");
    }

    #[test]
    fn includes_max_tokens_when_set() {
        let mut config = ProviderConfig::new(ProviderKind::Groq, None);
        config.max_tokens = Some(256);
        let provider = GroqProvider::new(config);
        let conversation = Conversation::from_json(&json!({"messages": [
            {"role": "user", "content": "Hi"}
        ]}))
        .unwrap();

        let value = serde_json::to_value(provider.build_request("p", &conversation)).unwrap();
        assert_eq!(value["max_tokens"], json!(256));
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn empty_choices_is_malformed() {
        let err = extract_reply(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
