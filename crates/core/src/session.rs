use crate::conversation::{ConversationConfig, ConversationalAgent};
use crate::error::{ChatError, IngestError};
use crate::ingest::DocumentPipeline;
use crate::models::{ChatTurn, IngestionReport, UploadedDocument};
use crate::traits::ChatModel;
use std::sync::Arc;
use tracing::{info, warn};

pub enum AgentState {
    Unready,
    Ready(ConversationalAgent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One-shot message shown to the user after an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    NoDocuments,
    Indexed(IngestionReport),
}

/// Builds the agent for a freshly indexed document set.
#[derive(Clone)]
pub struct AgentFactory {
    pub model: Arc<dyn ChatModel>,
    pub config: ConversationConfig,
}

/// Per-user state: the agent (if documents were processed) and its transcript.
pub struct Session {
    state: AgentState,
    report: Option<IngestionReport>,
    notice: Option<Notice>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: AgentState::Unready,
            report: None,
            notice: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AgentState::Ready(_))
    }

    pub fn history(&self) -> &[ChatTurn] {
        match &self.state {
            AgentState::Unready => &[],
            AgentState::Ready(agent) => agent.history(),
        }
    }

    pub fn report(&self) -> Option<&IngestionReport> {
        self.report.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Runs the pipeline and swaps in a new agent. On error the session is
    /// left exactly as it was.
    pub async fn process(
        &mut self,
        documents: Vec<UploadedDocument>,
        pipeline: &DocumentPipeline,
        factory: &AgentFactory,
    ) -> Result<ProcessOutcome, IngestError> {
        if documents.is_empty() {
            return Ok(ProcessOutcome::NoDocuments);
        }

        let (retriever, report) = pipeline.process(documents).await?;
        let agent = ConversationalAgent::new(
            Arc::new(retriever),
            Arc::clone(&factory.model),
            factory.config.clone(),
        );

        self.state = AgentState::Ready(agent);
        self.report = Some(report.clone());
        Ok(ProcessOutcome::Indexed(report))
    }

    /// `Ok(None)` when there is nothing to answer: no documents processed yet
    /// or a blank question.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>, ChatError> {
        let question = question.trim();
        let agent = match &mut self.state {
            AgentState::Ready(agent) if !question.is_empty() => agent,
            AgentState::Ready(_) => return Ok(None),
            AgentState::Unready => {
                info!("question ignored; no documents processed");
                return Ok(None);
            }
        };

        agent.answer(question).await.map(Some)
    }

    /// Process and report the outcome as a notice, the way the UI shows it.
    pub async fn process_with_notice(
        &mut self,
        documents: Vec<UploadedDocument>,
        pipeline: &DocumentPipeline,
        factory: &AgentFactory,
    ) -> Notice {
        let notice = match self.process(documents, pipeline, factory).await {
            Ok(ProcessOutcome::NoDocuments) => {
                Notice::warning("Please upload at least one PDF to process.")
            }
            Ok(ProcessOutcome::Indexed(report)) => Notice::success(format!(
                "Documents processed successfully! {} document(s), {} page(s), {} chunk(s). You can now ask questions.",
                report.documents, report.pages, report.chunks
            )),
            Err(IngestError::EmptyText) => Notice::error(
                "No text could be extracted from the uploaded PDFs. Scanned documents are not supported.",
            ),
            Err(error) => {
                warn!(%error, "processing failed");
                Notice::error(format!("Processing failed: {error}"))
            }
        };
        self.notice = Some(notice.clone());
        notice
    }

    /// Ask and record a failure as an error notice.
    pub async fn ask_with_notice(&mut self, question: &str) -> Option<String> {
        match self.ask(question).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%error, "question failed");
                self.notice = Some(Notice::error(format!("Could not answer: {error}")));
                None
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingConfig;
    use crate::conversation::tests::RecordingModel;
    use crate::embeddings::{CharacterNgramEmbedder, Embedder};
    use crate::error::ProviderError;
    use crate::extractor::tests::sample_pdf;
    use crate::extractor::PdfBackend;
    use async_trait::async_trait;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::InvalidResponse {
                backend: "stub".to_string(),
                details: "embedding service down".to_string(),
            })
        }
    }

    fn pipeline(embedder: Arc<dyn Embedder>) -> DocumentPipeline {
        DocumentPipeline::new(
            PdfBackend::Lopdf.extractor(),
            ChunkingConfig::default(),
            embedder,
            16,
        )
        .expect("valid pipeline")
    }

    fn factory(model: Arc<RecordingModel>) -> AgentFactory {
        AgentFactory {
            model,
            config: ConversationConfig::default(),
        }
    }

    fn manual() -> Vec<UploadedDocument> {
        vec![UploadedDocument::new(
            "manual.pdf",
            sample_pdf(&["The relief valve opens at 210 bar."]),
        )]
    }

    #[tokio::test]
    async fn processing_nothing_warns_and_stays_unready() {
        let mut session = Session::new();
        let notice = session
            .process_with_notice(
                Vec::new(),
                &pipeline(Arc::new(CharacterNgramEmbedder::default())),
                &factory(Arc::new(RecordingModel::default())),
            )
            .await;

        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(!session.is_ready());
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn question_while_unready_is_a_no_op() {
        let mut session = Session::new();
        assert_eq!(session.ask("Anyone there?").await.expect("no error"), None);
        assert!(session.history().is_empty());
        assert!(session.take_notice().is_none());
    }

    #[tokio::test]
    async fn processed_session_answers_and_grows_history() {
        let mut session = Session::new();
        let outcome = session
            .process(
                manual(),
                &pipeline(Arc::new(CharacterNgramEmbedder::default())),
                &factory(Arc::new(RecordingModel::default())),
            )
            .await
            .expect("process");
        assert!(matches!(outcome, ProcessOutcome::Indexed(ref report) if report.chunks == 1));
        assert!(session.is_ready());

        let reply = session
            .ask("When does the relief valve open?")
            .await
            .expect("answer")
            .expect("ready session answers");
        assert!(!reply.is_empty());
        assert_eq!(session.history().len(), 2);

        assert_eq!(session.ask("   ").await.expect("blank"), None);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn failed_processing_keeps_the_previous_agent() {
        let mut session = Session::new();
        let model = Arc::new(RecordingModel::default());
        session
            .process(
                manual(),
                &pipeline(Arc::new(CharacterNgramEmbedder::default())),
                &factory(Arc::clone(&model)),
            )
            .await
            .expect("first run");
        session.ask("When does the relief valve open?").await.expect("answer");

        let notice = session
            .process_with_notice(manual(), &pipeline(Arc::new(FailingEmbedder)), &factory(model))
            .await;

        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(session.is_ready());
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn failed_question_is_surfaced_and_not_recorded() {
        let mut session = Session::new();
        let model = Arc::new(RecordingModel {
            fail: true,
            ..RecordingModel::default()
        });
        session
            .process(
                manual(),
                &pipeline(Arc::new(CharacterNgramEmbedder::default())),
                &factory(model),
            )
            .await
            .expect("process");

        assert_eq!(session.ask_with_notice("When?").await, None);
        assert!(session.history().is_empty());
        let notice = session.take_notice().expect("error notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(session.take_notice().is_none());
    }

    #[tokio::test]
    async fn reprocessing_starts_a_fresh_transcript() {
        let mut session = Session::new();
        let pipeline = pipeline(Arc::new(CharacterNgramEmbedder::default()));
        let factory = factory(Arc::new(RecordingModel::default()));

        session.process(manual(), &pipeline, &factory).await.expect("first");
        session.ask("When?").await.expect("answer");
        session.process(manual(), &pipeline, &factory).await.expect("second");

        assert!(session.is_ready());
        assert!(session.history().is_empty());

        session.reset();
        assert!(!session.is_ready());
    }
}
