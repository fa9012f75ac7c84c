use pdf_chat_core::{
    discover_pdf_files, load_documents, AgentFactory, DocumentPipeline, NoticeLevel, Session,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

const QUIT_COMMANDS: [&str; 3] = ["exit", "quit", ":q"];

/// Processes the given PDFs and answers questions read from stdin.
pub async fn run(
    pipeline: &DocumentPipeline,
    factory: &AgentFactory,
    folder: Option<PathBuf>,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut paths = files;
    if let Some(folder) = folder {
        paths.extend(discover_pdf_files(&folder));
    }
    info!(files = paths.len(), "loading pdfs");

    let documents = load_documents(&paths)?;
    let mut session = Session::new();
    let notice = session.process_with_notice(documents, pipeline, factory).await;
    session.take_notice();

    if notice.level != NoticeLevel::Success {
        anyhow::bail!(notice.message);
    }
    println!("{}", notice.message);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    converse(&mut session, stdin, &mut stdout).await
}

/// One question per line until EOF or a quit command.
pub async fn converse<R, W>(session: &mut Session, reader: R, writer: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        writer.write_all(b"> ").await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if QUIT_COMMANDS.contains(&question) {
            break;
        }

        if let Some(answer) = session.ask_with_notice(question).await {
            writer.write_all(format!("Bot: {answer}\n").as_bytes()).await?;
        } else if let Some(notice) = session.take_notice() {
            writer
                .write_all(format!("error: {}\n", notice.message).as_bytes())
                .await?;
        }
    }

    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
