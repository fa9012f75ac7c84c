pub mod chunking;
pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod openai;
pub mod session;
pub mod traits;

pub use chunking::{reconstruct, split_text, ChunkingConfig};
pub use config::{ModelSettings, OpenAiConfig};
pub use conversation::{ConversationConfig, ConversationalAgent};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ChatError, ConfigError, IngestError, ProviderError};
pub use extractor::{
    extract_text, ExtractedText, LopdfExtractor, PdfBackend, PdfExtractExtractor, PdfExtractor,
};
pub use index::{ChunkIndex, IndexRetriever};
pub use ingest::{discover_pdf_files, is_pdf_name, load_documents, DocumentPipeline};
pub use llm::OpenAiChatModel;
pub use models::{ChatRole, ChatTurn, IngestionReport, ScoredChunk, TextChunk, UploadedDocument};
pub use openai::OpenAiClient;
pub use session::{AgentFactory, AgentState, Notice, NoticeLevel, ProcessOutcome, Session};
pub use traits::{ChatMessage, ChatModel, MessageRole, Retriever};
