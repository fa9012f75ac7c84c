use crate::chunking::{split_text, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{extract_text_blocking, PdfExtractor};
use crate::index::{ChunkIndex, IndexRetriever};
use crate::models::{IngestionReport, UploadedDocument};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if is_pdf_name(&entry.path().to_string_lossy()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<UploadedDocument>, IngestError> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok(UploadedDocument::new(name, fs::read(path)?))
        })
        .collect()
}

/// Extract → chunk → index for one batch of uploaded documents.
pub struct DocumentPipeline {
    extractor: Arc<dyn PdfExtractor>,
    chunking: ChunkingConfig,
    embedder: Arc<dyn Embedder>,
    embedding_batch_size: usize,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        chunking: ChunkingConfig,
        embedder: Arc<dyn Embedder>,
        embedding_batch_size: usize,
    ) -> Result<Self, IngestError> {
        chunking.validate()?;
        Ok(Self {
            extractor,
            chunking,
            embedder,
            embedding_batch_size,
        })
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub async fn process(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> Result<(IndexRetriever, IngestionReport), IngestError> {
        let document_count = documents.len();
        for document in &documents {
            info!(
                document = %document.name,
                bytes = document.bytes.len(),
                checksum = %document.checksum(),
                "processing pdf"
            );
        }

        let extracted = extract_text_blocking(documents, Arc::clone(&self.extractor)).await?;
        if extracted.text.trim().is_empty() {
            return Err(IngestError::EmptyText);
        }

        let chunks = split_text(&extracted.text, &self.chunking);
        let chunk_count = chunks.len();
        let index =
            ChunkIndex::build(chunks, self.embedder.as_ref(), self.embedding_batch_size).await?;

        let report = IngestionReport {
            documents: document_count,
            pages: extracted.pages,
            characters: extracted.text.chars().count(),
            chunks: chunk_count,
            processed_at: Utc::now(),
        };
        info!(
            documents = report.documents,
            pages = report.pages,
            chunks = report.chunks,
            "documents indexed"
        );

        Ok((IndexRetriever::new(index, Arc::clone(&self.embedder)), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::ProviderError;
    use crate::extractor::tests::sample_pdf;
    use crate::extractor::PdfBackend;
    use async_trait::async_trait;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::BackendResponse {
                backend: "stub".to_string(),
                status: 503,
                details: "unavailable".to_string(),
            })
        }
    }

    fn pipeline(embedder: Arc<dyn Embedder>, chunk_size: usize) -> DocumentPipeline {
        DocumentPipeline::new(
            PdfBackend::Lopdf.extractor(),
            ChunkingConfig {
                chunk_size,
                chunk_overlap: chunk_size / 5,
                ..ChunkingConfig::default()
            },
            embedder,
            8,
        )
        .expect("valid pipeline")
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"skip"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);

        let documents = load_documents(&files)?;
        assert_eq!(documents[0].name, "a.pdf");
        assert_eq!(documents[0].bytes, b"%PDF-1.4\n%fake");
        Ok(())
    }

    #[test]
    fn invalid_chunking_is_rejected_up_front() {
        let result = DocumentPipeline::new(
            PdfBackend::Lopdf.extractor(),
            ChunkingConfig {
                chunk_size: 10,
                chunk_overlap: 10,
                ..ChunkingConfig::default()
            },
            Arc::new(CharacterNgramEmbedder::default()),
            8,
        );
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[tokio::test]
    async fn processing_builds_one_vector_per_chunk() {
        let pipeline = pipeline(Arc::new(CharacterNgramEmbedder::default()), 20);
        let documents = vec![
            UploadedDocument::new("a.pdf", sample_pdf(&["Pumps move hydraulic fluid", "Valves"])),
            UploadedDocument::new("b.pdf", sample_pdf(&["Filters remove particles"])),
        ];

        let (retriever, report) = pipeline.process(documents).await.expect("process");
        assert_eq!(report.documents, 2);
        assert_eq!(report.pages, 3);
        assert!(report.chunks > 1);
        assert_eq!(retriever.index().len(), report.chunks);
    }

    #[tokio::test]
    async fn reprocessing_yields_the_same_chunk_count() {
        let pipeline = pipeline(Arc::new(CharacterNgramEmbedder::default()), 24);
        let bytes = sample_pdf(&["Maintenance interval is 500 hours", "Oil grade is ISO VG 46"]);

        let (first, _) = pipeline
            .process(vec![UploadedDocument::new("manual.pdf", bytes.clone())])
            .await
            .expect("first run");
        let (second, _) = pipeline
            .process(vec![UploadedDocument::new("manual.pdf", bytes)])
            .await
            .expect("second run");

        assert_eq!(first.index().len(), second.index().len());
        assert_eq!(first.index().chunks(), second.index().chunks());
    }

    #[tokio::test]
    async fn document_without_text_is_rejected() {
        let pipeline = pipeline(Arc::new(CharacterNgramEmbedder::default()), 100);
        let result = pipeline
            .process(vec![UploadedDocument::new("blank.pdf", sample_pdf(&[" "]))])
            .await;
        assert!(matches!(result, Err(IngestError::EmptyText)));
    }

    #[tokio::test]
    async fn embedding_failure_is_propagated() {
        let pipeline = pipeline(Arc::new(FailingEmbedder), 100);
        let result = pipeline
            .process(vec![UploadedDocument::new("a.pdf", sample_pdf(&["Some text"]))])
            .await;
        assert!(matches!(result, Err(IngestError::Embedding(_))));
    }

    #[tokio::test]
    async fn unreadable_pdf_fails_the_run() {
        let pipeline = pipeline(Arc::new(CharacterNgramEmbedder::default()), 100);
        let result = pipeline
            .process(vec![
                UploadedDocument::new("good.pdf", sample_pdf(&["Readable"])),
                UploadedDocument::new("bad.pdf", b"%PDF-1.4\n%broken".to_vec()),
            ])
            .await;
        assert!(matches!(result, Err(IngestError::PdfParse { .. })));
    }
}
