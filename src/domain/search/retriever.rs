use async_trait::async_trait;

use super::SearchHit;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Retrieval collaborator: ranked semantic search over the document index
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns at most `top_k` hits ordered by descending score
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<SearchHit>, DomainError>;

    /// Number of chunks available for search
    fn indexed_chunks(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_retriever() {
        let mut mock = MockRetriever::new();
        mock.expect_search()
            .withf(|query, top_k| query == "rust" && *top_k == 2)
            .returning(|_, _| Ok(vec![SearchHit::new("1", 0.9, "Rust is fast")]));

        let hits = mock.search("rust", 2).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
    }
}
