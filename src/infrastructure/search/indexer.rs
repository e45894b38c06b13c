use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{load_documents, save_index};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::search::{IndexedChunk, SourceDocument};
use crate::domain::DomainError;

/// Outcome of an index build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks: usize,
    pub batches: usize,
    pub total_tokens: u64,
}

/// Computes one embedding per document chunk and persists the search index
#[derive(Debug)]
pub struct IndexBuilder {
    embeddings: Arc<dyn EmbeddingProvider>,
    deployment: String,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, deployment: impl Into<String>) -> Self {
        Self {
            embeddings,
            deployment: deployment.into(),
            batch_size: 16,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn validate(documents: &[SourceDocument]) -> Result<(), DomainError> {
        let mut seen = HashSet::new();

        for doc in documents {
            if doc.chunk.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "Document '{}' has an empty chunk",
                    doc.id
                )));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "Duplicate document id '{}'",
                    doc.id
                )));
            }
        }

        Ok(())
    }

    /// Embeds `documents` in batches, preserving input order
    pub async fn build(
        &self,
        documents: Vec<SourceDocument>,
    ) -> Result<(Vec<IndexedChunk>, IndexReport), DomainError> {
        Self::validate(&documents)?;

        let mut chunks = Vec::with_capacity(documents.len());
        let mut report = IndexReport {
            chunks: 0,
            batches: 0,
            total_tokens: 0,
        };

        for batch in documents.chunks(self.batch_size) {
            let texts = batch.iter().map(|d| d.chunk.clone()).collect();
            let response = self
                .embeddings
                .embed(EmbeddingRequest::batch(&self.deployment, texts))
                .await?;

            report.batches += 1;
            report.total_tokens += response.total_tokens() as u64;

            let vectors = response.into_vectors();
            if vectors.len() != batch.len() {
                return Err(DomainError::provider(
                    self.embeddings.provider_name(),
                    format!("Expected {} embeddings, received {}", batch.len(), vectors.len()),
                ));
            }

            chunks.extend(batch.iter().zip(vectors).map(|(doc, embedding)| IndexedChunk {
                id: doc.id.clone(),
                chunk: doc.chunk.clone(),
                embedding,
            }));

            info!(done = chunks.len(), total = documents.len(), "Embedded batch");
        }

        report.chunks = chunks.len();
        Ok((chunks, report))
    }

    /// Reads the corpus at `documents`, builds the index and writes it to `output`
    pub async fn build_file(&self, documents: &Path, output: &Path) -> Result<IndexReport, DomainError> {
        let docs = load_documents(documents).await?;
        let (chunks, report) = self.build(docs).await?;
        save_index(output, &chunks).await?;

        info!(
            output = %output.display(),
            chunks = report.chunks,
            batches = report.batches,
            "Search index written"
        );

        Ok(report)
    }
}
