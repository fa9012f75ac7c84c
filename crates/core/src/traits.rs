use crate::error::ProviderError;
use crate::models::ScoredChunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait Retriever: Send + Sync {
    /// The `k` chunks most similar to `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ProviderError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}
