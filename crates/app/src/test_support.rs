use crate::state::AppState;
use async_trait::async_trait;
use pdf_chat_core::{
    AgentFactory, CharacterNgramEmbedder, ChatMessage, ChatModel, ChunkingConfig,
    ConversationConfig, DocumentPipeline, IngestError, PdfExtractor, ProviderError,
    UploadedDocument,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pretends every upload is a one-page manual.
pub struct ManualExtractor;

impl PdfExtractor for ManualExtractor {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn extract_pages(&self, _document: &UploadedDocument) -> Result<Vec<String>, IngestError> {
        Ok(vec!["The relief valve opens at 210 bar.\nThe pump runs at 1450 rpm.\n".to_string()])
    }
}

/// Numbers its replies.
#[derive(Default)]
pub struct CountingModel {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for CountingModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("reply {call}"))
    }
}

pub fn test_pipeline() -> DocumentPipeline {
    DocumentPipeline::new(
        Arc::new(ManualExtractor),
        ChunkingConfig::default(),
        Arc::new(CharacterNgramEmbedder::default()),
        16,
    )
    .expect("valid pipeline")
}

pub fn test_factory() -> AgentFactory {
    AgentFactory {
        model: Arc::new(CountingModel::default()),
        config: ConversationConfig::default(),
    }
}

pub fn test_state() -> AppState {
    AppState::new(test_pipeline(), test_factory())
}
