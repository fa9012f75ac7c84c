use crate::error::IngestError;
use crate::models::UploadedDocument;
use lopdf::Document;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Page-oriented text extraction. A page that yields no text is returned as
/// an empty string; only a document that cannot be opened is an error.
pub trait PdfExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract_pages(&self, document: &UploadedDocument) -> Result<Vec<String>, IngestError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PdfBackend {
    #[default]
    Lopdf,
    PdfExtract,
}

impl PdfBackend {
    pub fn extractor(self) -> Arc<dyn PdfExtractor> {
        match self {
            PdfBackend::Lopdf => Arc::new(LopdfExtractor),
            PdfBackend::PdfExtract => Arc::new(PdfExtractExtractor),
        }
    }
}

#[derive(Debug, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_pages(&self, document: &UploadedDocument) -> Result<Vec<String>, IngestError> {
        let pdf = Document::load_mem(&document.bytes).map_err(|error| IngestError::PdfParse {
            document: document.name.clone(),
            details: error.to_string(),
        })?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in pdf.get_pages() {
            match pdf.extract_text(&[page_no]) {
                Ok(text) => pages.push(text),
                Err(error) => {
                    warn!(document = %document.name, page = page_no, %error, "page has no extractable text");
                    pages.push(String::new());
                }
            }
        }

        Ok(pages)
    }
}

#[derive(Debug, Default)]
pub struct PdfExtractExtractor;

impl PdfExtractor for PdfExtractExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, document: &UploadedDocument) -> Result<Vec<String>, IngestError> {
        let parse_error = |details: String| IngestError::PdfParse {
            document: document.name.clone(),
            details,
        };

        let mut pdf = pdf_extract::Document::load_mem(&document.bytes)
            .map_err(|error| parse_error(error.to_string()))?;
        if pdf.is_encrypted() {
            pdf.decrypt("").map_err(|error| parse_error(error.to_string()))?;
        }

        let mut pages = Vec::new();
        for page_no in pdf.get_pages().into_keys() {
            match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract_page(&pdf, page_no))) {
                Ok(Ok(text)) => pages.push(text),
                Ok(Err(error)) => {
                    warn!(document = %document.name, page = page_no, %error, "page has no extractable text");
                    pages.push(String::new());
                }
                Err(payload) => {
                    warn!(
                        document = %document.name,
                        page = page_no,
                        error = panic_message(payload.as_ref()),
                        "pdf-extract panicked on page"
                    );
                    pages.push(String::new());
                }
            }
        }

        Ok(pages)
    }
}

fn pdf_extract_page(
    pdf: &pdf_extract::Document,
    page_no: u32,
) -> Result<String, pdf_extract::OutputError> {
    let mut text = String::new();
    {
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        pdf_extract::output_doc_page(pdf, &mut output, page_no)?;
    }
    Ok(text)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

/// Concatenates every page of every document, in input order.
pub fn extract_text(
    documents: &[UploadedDocument],
    extractor: &dyn PdfExtractor,
) -> Result<ExtractedText, IngestError> {
    let mut extracted = ExtractedText::default();

    for document in documents {
        let pages = extractor.extract_pages(document)?;
        debug!(
            document = %document.name,
            backend = extractor.name(),
            pages = pages.len(),
            "extracted pdf"
        );
        extracted.pages += pages.len();
        for page in pages {
            extracted.text.push_str(&page);
        }
    }

    Ok(extracted)
}

/// Runs [`extract_text`] on the blocking pool; parsers are CPU-bound and
/// some of them panic on malformed input.
pub async fn extract_text_blocking(
    documents: Vec<UploadedDocument>,
    extractor: Arc<dyn PdfExtractor>,
) -> Result<ExtractedText, IngestError> {
    tokio::task::spawn_blocking(move || extract_text(&documents, extractor.as_ref()))
        .await
        .map_err(|error| IngestError::Worker(error.to_string()))?
}
