use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::search::{rank, IndexedChunk, Retriever, SearchHit};
use crate::domain::DomainError;

/// Retriever that embeds the query and ranks an in-memory index by cosine similarity
#[derive(Debug)]
pub struct EmbeddingRetriever {
    embeddings: Arc<dyn EmbeddingProvider>,
    deployment: String,
    chunks: Arc<Vec<IndexedChunk>>,
}

impl EmbeddingRetriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        deployment: impl Into<String>,
        chunks: Vec<IndexedChunk>,
    ) -> Self {
        Self {
            embeddings,
            deployment: deployment.into(),
            chunks: Arc::new(chunks),
        }
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<SearchHit>, DomainError> {
        if top_k < 1 {
            return Err(DomainError::validation("top_k must be at least 1"));
        }

        let response = self
            .embeddings
            .embed(EmbeddingRequest::single(&self.deployment, query))
            .await?;

        let vector = response.first().ok_or_else(|| {
            DomainError::provider(self.embeddings.provider_name(), "No embedding returned")
        })?;

        let hits = rank(vector, &self.chunks, top_k as usize);

        for hit in &hits {
            debug!(id = %hit.id, score = hit.score, "Search hit");
        }

        Ok(hits)
    }

    fn indexed_chunks(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;

    fn chunk(id: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            chunk: format!("chunk {}", id),
            embedding,
        }
    }

    fn retriever(provider: MockEmbeddingProvider) -> EmbeddingRetriever {
        EmbeddingRetriever::new(
            Arc::new(provider),
            "text-embedding-3-large",
            vec![
                chunk("a", vec![1.0, 0.0]),
                chunk("b", vec![0.0, 1.0]),
                chunk("c", vec![0.7, 0.7]),
            ],
        )
    }

    #[tokio::test]
    async fn test_search_ranks_and_truncates() {
        let provider = MockEmbeddingProvider::new(2).with_vector("east", vec![1.0, 0.1]);
        let retriever = retriever(provider);

        let hits = retriever.search("east", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits.iter().all(|h| (-1.0..=1.0).contains(&h.score)));
    }

    #[tokio::test]
    async fn test_top_k_larger_than_index() {
        let provider = MockEmbeddingProvider::new(2).with_vector("q", vec![0.0, 1.0]);
        let hits = retriever(provider).search("q", 10).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let provider = MockEmbeddingProvider::new(2).with_error("quota exceeded");
        let result = retriever(provider).search("q", 3).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[test]
    fn test_indexed_chunks() {
        assert_eq!(retriever(MockEmbeddingProvider::new(2)).indexed_chunks(), 3);
    }
}
