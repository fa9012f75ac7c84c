use crate::error::ProviderError;
use crate::openai::OpenAiClient;
use crate::traits::{ChatMessage, ChatModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiChatModel {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(client: OpenAiClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
        };
        let response: CompletionResponse = self
            .client
            .post_json("v1/chat/completions", &request)
            .await?;
        first_choice(response)
    }
}

fn first_choice(response: CompletionResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse {
            backend: "openai".to_string(),
            details: "completion had no message content".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MessageRole;

    #[test]
    fn request_serializes_roles_in_lowercase() {
        let messages = vec![
            ChatMessage::new(MessageRole::System, "context"),
            ChatMessage::new(MessageRole::User, "question"),
        ];
        let request = CompletionRequest {
            model: "gpt-3.5-turbo",
            temperature: 0.5,
            messages: &messages,
        };

        let value = serde_json::to_value(&request).expect("serializable");
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "question");
    }

    #[test]
    fn first_choice_content_is_returned() {
        let payload = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Hi there \n"},"finish_reason":"stop"}]}"#;
        let response: CompletionResponse = serde_json::from_str(payload).expect("valid payload");
        assert_eq!(first_choice(response).expect("content"), "Hi there");
    }

    #[test]
    fn empty_completion_is_an_error() {
        let payload = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: CompletionResponse = serde_json::from_str(payload).expect("valid payload");
        assert!(first_choice(response).is_err());

        let response: CompletionResponse =
            serde_json::from_str(r#"{"choices":[]}"#).expect("valid payload");
        assert!(first_choice(response).is_err());
    }
}
