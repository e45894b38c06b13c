//! Azure OpenAI embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;
use crate::infrastructure::llm::{AzureOpenAiConfig, HttpClientTrait};

/// Azure OpenAI embedding provider; the request's deployment selects the model
#[derive(Debug)]
pub struct AzureOpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    config: AzureOpenAiConfig,
}

impl<C: HttpClientTrait> AzureOpenAiEmbeddingProvider<C> {
    pub fn new(client: C, config: AzureOpenAiConfig) -> Self {
        Self { client, config }
    }

    fn embeddings_url(&self, deployment: &str) -> String {
        self.config.deployment_url(deployment, "embeddings")
    }

    fn build_request(&self, request: &EmbeddingRequest) -> serde_json::Value {
        serde_json::json!({ "input": request.inputs() })
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        expected: usize,
    ) -> Result<EmbeddingResponse, DomainError> {
        let mut response: AzureEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(
                "azure_openai",
                format!("Failed to parse embedding response: {}", e),
            )
        })?;

        if response.data.len() != expected {
            return Err(DomainError::provider(
                "azure_openai",
                format!(
                    "Expected {} embeddings, received {}",
                    expected,
                    response.data.len()
                ),
            ));
        }

        // the service may return items out of input order
        response.data.sort_by_key(|d| d.index);

        let vectors = response.data.into_iter().map(|d| d.embedding).collect();
        let total_tokens = response.usage.map(|u| u.total_tokens).unwrap_or_default();

        Ok(EmbeddingResponse::new(vectors, total_tokens))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for AzureOpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        if request.inputs().is_empty() {
            return Ok(EmbeddingResponse::new(Vec::new(), 0));
        }

        let url = self.embeddings_url(request.deployment());
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, self.config.headers(), &body)
            .await?;

        self.parse_response(response, request.inputs().len())
    }

    fn provider_name(&self) -> &'static str {
        "azure_openai"
    }
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingResponse {
    data: Vec<AzureEmbeddingData>,
    usage: Option<AzureEmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingUsage {
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::MockHttpClient;

    const TEST_URL: &str = "https://myresource.openai.azure.com/openai/deployments/text-embedding-3-large/embeddings?api-version=2024-06-01";
    const DEPLOYMENT: &str = "text-embedding-3-large";

    fn config() -> AzureOpenAiConfig {
        AzureOpenAiConfig::new("https://myresource.openai.azure.com", "test-api-key")
    }

    fn mock_response(indices: &[usize], dimensions: usize) -> serde_json::Value {
        let data: Vec<serde_json::Value> = indices
            .iter()
            .map(|&i| {
                let embedding: Vec<f32> = (0..dimensions).map(|j| (i * 10 + j) as f32).collect();
                serde_json::json!({"index": i, "embedding": embedding, "object": "embedding"})
            })
            .collect();

        serde_json::json!({
            "model": DEPLOYMENT,
            "data": data,
            "usage": {"prompt_tokens": 7, "total_tokens": 7}
        })
    }

    #[tokio::test]
    async fn test_embed_single_text() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(&[0], 4));
        let provider = AzureOpenAiEmbeddingProvider::new(client, config());

        let response = provider
            .embed(EmbeddingRequest::single(DEPLOYMENT, "Hello world"))
            .await
            .unwrap();

        assert_eq!(response.first(), Some(&[0.0, 1.0, 2.0, 3.0][..]));
        assert_eq!(response.total_tokens(), 7);
    }

    #[tokio::test]
    async fn test_embed_batch_is_reordered_by_index() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(&[1, 0], 2));
        let provider = AzureOpenAiEmbeddingProvider::new(client, config());

        let response = provider
            .embed(EmbeddingRequest::batch(
                DEPLOYMENT,
                vec!["first".into(), "second".into()],
            ))
            .await
            .unwrap();

        let vectors = response.into_vectors();
        assert_eq!(vectors[0], vec![0.0, 1.0]);
        assert_eq!(vectors[1], vec![10.0, 11.0]);
    }

    #[tokio::test]
    async fn test_request_body_carries_inputs() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(&[0], 2));
        let provider = AzureOpenAiEmbeddingProvider::new(client, config());

        provider
            .embed(EmbeddingRequest::single(DEPLOYMENT, "Hello"))
            .await
            .unwrap();

        let requests = provider.client.requests();
        assert_eq!(requests[0].1, serde_json::json!({"input": ["Hello"]}));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_an_error() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(&[0], 2));
        let provider = AzureOpenAiEmbeddingProvider::new(client, config());

        let result = provider
            .embed(EmbeddingRequest::batch(DEPLOYMENT, vec!["a".into(), "b".into()]))
            .await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_embed_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "Rate limit exceeded");
        let provider = AzureOpenAiEmbeddingProvider::new(client, config());

        let result = provider
            .embed(EmbeddingRequest::single(DEPLOYMENT, "Hello"))
            .await;

        assert!(result.is_err());
    }
}
