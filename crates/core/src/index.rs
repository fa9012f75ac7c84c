use crate::embeddings::Embedder;
use crate::error::{IngestError, ProviderError};
use crate::models::{ScoredChunk, TextChunk};
use crate::traits::Retriever;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Brute-force cosine index over one processing run's chunks. Immutable once
/// built; a new run builds a new index.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    chunks: Vec<TextChunk>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

impl ChunkIndex {
    /// Embeds every chunk and builds the index. Any failure discards the
    /// partial work.
    pub async fn build(
        chunks: Vec<TextChunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self, IngestError> {
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embedded = embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(IngestError::IndexMismatch(format!(
                    "embedding count {} doesn't match chunk count {}",
                    embedded.len(),
                    texts.len()
                )));
            }
            debug!(embedder = embedder.name(), batch = texts.len(), "embedded batch");
            vectors.extend(embedded);
        }

        let index = Self::from_parts(chunks, vectors)?;
        match embedder.dimensions() {
            Some(expected) if !index.is_empty() && index.dimensions != expected => {
                Err(IngestError::IndexMismatch(format!(
                    "{} returned {}-dimensional vectors, expected {expected}",
                    embedder.name(),
                    index.dimensions
                )))
            }
            _ => Ok(index),
        }
    }

    pub fn from_parts(chunks: Vec<TextChunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IngestError> {
        if chunks.len() != vectors.len() {
            return Err(IngestError::IndexMismatch(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|vector| vector.len() != dimensions) {
            return Err(IngestError::IndexMismatch(format!(
                "embedding dimension {} != {}",
                bad.len(),
                dimensions
            )));
        }

        Ok(Self {
            chunks,
            vectors,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, cosine_similarity(query_vector, vector)))
            .collect();

        scored.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(position, score)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Embeds the query with the same embedder that built the index.
pub struct IndexRetriever {
    index: ChunkIndex,
    embedder: Arc<dyn Embedder>,
}

impl IndexRetriever {
    pub fn new(index: ChunkIndex, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, ProviderError> {
        let query_vector = self.embedder.embed(query).await?;
        Ok(self.index.search(&query_vector, k))
    }
}
