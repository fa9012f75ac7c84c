mod chat;
mod page;
mod server;
mod state;
#[cfg(test)]
mod test_support;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_chat_core::config::{DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use pdf_chat_core::{
    AgentFactory, CharacterNgramEmbedder, ChunkingConfig, ConversationConfig, DocumentPipeline,
    Embedder, ModelSettings, OpenAiChatModel, OpenAiClient, OpenAiConfig, OpenAiEmbedder,
    PdfBackend,
};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Chat completion model
    #[arg(long, env = "PDF_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Sampling temperature for answers
    #[arg(long, default_value = "0.7")]
    temperature: f32,

    /// Embedding model used by the openai provider
    #[arg(long, env = "PDF_CHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Where chunk embeddings come from
    #[arg(long, value_enum, default_value_t = EmbeddingProvider::Openai)]
    embedding_provider: EmbeddingProvider,

    /// Chunks per embedding request
    #[arg(long, default_value = "64")]
    embedding_batch_size: usize,

    /// PDF text extraction library
    #[arg(long, value_enum, default_value_t = PdfBackendArg::Lopdf)]
    pdf_backend: PdfBackendArg,

    /// Maximum chunk length in characters
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Maximum overlap between neighbouring chunks in characters
    #[arg(long, default_value = "200")]
    chunk_overlap: usize,

    /// Preferred split point; `\n` and `\t` escapes are understood
    #[arg(long, default_value = "\\n")]
    separator: String,

    /// Chunks retrieved per question
    #[arg(long, default_value = "4")]
    top_k: usize,

    /// Send follow-up questions as-is instead of rephrasing them with the history
    #[arg(long, default_value_t = false)]
    no_condense_question: bool,

    /// Timeout for a single API request
    #[arg(long, default_value = "120")]
    request_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web UI.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value = "8501")]
        port: u16,
        /// Maximum size of one upload request in MiB.
        #[arg(long, default_value = "200")]
        max_upload_mb: usize,
        /// Minutes a browser session may stay idle before it is dropped.
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
        session_ttl_mins: u64,
    },
    /// Process PDFs and chat in the terminal.
    Chat {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Individual PDF files.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbeddingProvider {
    Openai,
    Ngram,
}

#[derive(Clone, Copy, ValueEnum)]
enum PdfBackendArg {
    Lopdf,
    PdfExtract,
}

impl From<PdfBackendArg> for PdfBackend {
    fn from(value: PdfBackendArg) -> Self {
        match value {
            PdfBackendArg::Lopdf => PdfBackend::Lopdf,
            PdfBackendArg::PdfExtract => PdfBackend::PdfExtract,
        }
    }
}

fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\t", "\t")
}

fn build_services(cli: &Cli) -> anyhow::Result<(DocumentPipeline, AgentFactory)> {
    let openai = OpenAiConfig::new(cli.api_key.clone(), cli.api_base.clone())?
        .with_request_timeout(Duration::from_secs(cli.request_timeout_secs));
    let models = ModelSettings {
        chat_model: cli.chat_model.clone(),
        temperature: cli.temperature,
        embedding_model: cli.embedding_model.clone(),
        embedding_batch_size: cli.embedding_batch_size,
    };
    models.validate()?;

    let client = OpenAiClient::new(&openai)?;
    let embedder: Arc<dyn Embedder> = match cli.embedding_provider {
        EmbeddingProvider::Openai => Arc::new(OpenAiEmbedder::new(
            client.clone(),
            models.embedding_model.clone(),
        )),
        EmbeddingProvider::Ngram => Arc::new(CharacterNgramEmbedder::default()),
    };
    let chunking = ChunkingConfig {
        separator: unescape(&cli.separator),
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
    };
    let pipeline = DocumentPipeline::new(
        PdfBackend::from(cli.pdf_backend).extractor(),
        chunking,
        embedder,
        models.embedding_batch_size,
    )?;

    let factory = AgentFactory {
        model: Arc::new(OpenAiChatModel::new(
            client,
            models.chat_model.clone(),
            models.temperature,
        )),
        config: ConversationConfig {
            top_k: cli.top_k.max(1),
            condense_question: !cli.no_condense_question,
        },
    };

    info!(
        chat_model = %models.chat_model,
        embedder = pipeline.embedder_name(),
        pdf_backend = ?PdfBackend::from(cli.pdf_backend),
        "services configured"
    );
    Ok((pipeline, factory))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    if let Ok(path) = &dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let cli = Cli::parse();
    let (pipeline, factory) = build_services(&cli)?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    match cli.command {
        Command::Serve {
            host,
            port,
            max_upload_mb,
            session_ttl_mins,
        } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let state = AppState::new(pipeline, factory);
            server::serve(
                state,
                addr,
                max_upload_mb.saturating_mul(1024 * 1024),
                Duration::from_secs(session_ttl_mins.saturating_mul(60)),
            )
            .await?;
        }
        Command::Chat { folder, files } => {
            if folder.is_none() && files.is_empty() {
                anyhow::bail!("pass --folder or at least one --file");
            }
            chat::run(&pipeline, &factory, folder, files).await?;
        }
    }

    Ok(())
}
