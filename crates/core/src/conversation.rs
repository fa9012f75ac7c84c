use crate::error::ChatError;
use crate::models::{ChatRole, ChatTurn, ScoredChunk};
use crate::traits::{ChatMessage, ChatModel, MessageRole, Retriever};
use std::sync::Arc;
use tracing::{debug, info};

const CONDENSE_INSTRUCTIONS: &str = "Given the conversation below and a follow-up question, \
rewrite the follow-up as a standalone question in its original language. \
Reply with the standalone question only.";

const ANSWER_INSTRUCTIONS: &str = "Answer the user's questions using the document excerpts below. \
If the excerpts do not contain the answer, say that you don't know instead of making one up.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    pub top_k: usize,
    pub condense_question: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            condense_question: true,
        }
    }
}

/// Retrieval-augmented chat over one document index. History only grows on a
/// fully successful exchange.
pub struct ConversationalAgent {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    config: ConversationConfig,
    history: Vec<ChatTurn>,
}

impl ConversationalAgent {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn ChatModel>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            retriever,
            model,
            config,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub async fn answer(&mut self, question: &str) -> Result<String, ChatError> {
        let standalone = self.standalone_question(question).await?;
        let hits = self
            .retriever
            .retrieve(&standalone, self.config.top_k)
            .await
            .map_err(ChatError::Retrieval)?;
        debug!(hits = hits.len(), "retrieved context");

        let messages = answer_messages(&hits, &self.history, question);
        let reply = self
            .model
            .complete(&messages)
            .await
            .map_err(ChatError::Completion)?;

        self.history.push(ChatTurn::user(question));
        self.history.push(ChatTurn::assistant(reply.clone()));
        info!(turns = self.history.len(), "question answered");
        Ok(reply)
    }

    async fn standalone_question(&self, question: &str) -> Result<String, ChatError> {
        if !self.config.condense_question || self.history.is_empty() {
            return Ok(question.to_string());
        }

        let messages = condense_messages(&self.history, question);
        let condensed = self
            .model
            .complete(&messages)
            .await
            .map_err(ChatError::Completion)?;
        debug!(%condensed, "condensed follow-up question");
        Ok(condensed)
    }
}

fn format_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| match turn.role {
            ChatRole::User => format!("Human: {}", turn.text),
            ChatRole::Assistant => format!("Assistant: {}", turn.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn condense_messages(history: &[ChatTurn], question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(MessageRole::System, CONDENSE_INSTRUCTIONS),
        ChatMessage::new(
            MessageRole::User,
            format!(
                "Chat history:\n{}\n\nFollow-up question: {question}",
                format_history(history)
            ),
        ),
    ]
}

fn answer_messages(hits: &[ScoredChunk], history: &[ChatTurn], question: &str) -> Vec<ChatMessage> {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(
        MessageRole::System,
        format!("{ANSWER_INSTRUCTIONS}\n\nExcerpts:\n{context}"),
    ));
    for turn in history {
        let role = match turn.role {
            ChatRole::User => MessageRole::User,
            ChatRole::Assistant => MessageRole::Assistant,
        };
        messages.push(ChatMessage::new(role, turn.text.clone()));
    }
    messages.push(ChatMessage::new(MessageRole::User, question));
    messages
}
