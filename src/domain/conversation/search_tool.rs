use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::retry::retry_with_timeout;
use super::{ConversationState, ProgressState, ProgressStep, RetryPolicy};
use crate::domain::agent::Tool;
use crate::domain::llm::ToolDefinition;
use crate::domain::search::Retriever;
use crate::domain::DomainError;

pub const SEARCH_TOOL_NAME: &str = "search";

#[derive(Debug, Deserialize)]
struct SearchArguments {
    query: String,
    #[serde(default, rename = "topK", alias = "top_k")]
    top_k: Option<u32>,
}

/// Retrieval collaborator exposed to the generation collaborator as a tool.
///
/// Every call is recorded as a progress step of the prompt being processed.
pub struct SearchTool {
    retriever: Arc<dyn Retriever>,
    state: Arc<Mutex<ConversationState>>,
    default_top_k: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTool")
            .field("default_top_k", &self.default_top_k)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl SearchTool {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        state: Arc<Mutex<ConversationState>>,
        default_top_k: u32,
    ) -> Self {
        Self {
            retriever,
            state,
            default_top_k,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::new(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn parse_arguments(&self, arguments: Value) -> Result<(String, u32), DomainError> {
        let args: SearchArguments = serde_json::from_value(arguments)
            .map_err(|e| DomainError::validation(format!("Invalid search arguments: {}", e)))?;

        if args.query.trim().is_empty() {
            return Err(DomainError::validation("Search query must not be empty"));
        }

        let top_k = args.top_k.unwrap_or(self.default_top_k);
        if top_k < 1 {
            return Err(DomainError::validation("topK must be at least 1"));
        }

        Ok((args.query, top_k))
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search the document index for excerpts relevant to a software development question",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural language search query"
                    },
                    "topK": {
                        "type": "integer",
                        "minimum": 1,
                        "default": self.default_top_k,
                        "description": "Number of results to return"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, DomainError> {
        let (query, top_k) = self.parse_arguments(arguments)?;

        let step = self.state.lock().await.push_progress(ProgressStep::new(
            format!("search: {}", query),
            ProgressState::Running,
        ));

        let retriever = &self.retriever;
        let query_ref = query.as_str();
        let outcome = retry_with_timeout(&self.retry, self.timeout, "search", move |_| async move {
            retriever.search(query_ref, top_k).await
        })
        .await;

        let final_state = if outcome.result.is_ok() {
            ProgressState::Done
        } else {
            ProgressState::Failed
        };
        self.state.lock().await.update_progress(step, final_state);

        let hits = outcome.result?;
        tracing::debug!(query = %query, top_k, hits = hits.len(), attempts = outcome.attempts, "Search completed");

        serde_json::to_value(hits)
            .map_err(|e| DomainError::internal(format!("Failed to serialize search hits: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::PromptItem;
    use crate::domain::search::{MockRetriever, SearchHit};

    fn processing_state() -> Arc<Mutex<ConversationState>> {
        let mut state = ConversationState::new();
        state.submit(PromptItem::with_default_count("What is X?").unwrap());
        let _ = state.poll_next();
        Arc::new(Mutex::new(state))
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(1).with_initial_delay(1).with_max_delay(1)
    }

    #[tokio::test]
    async fn test_search_returns_hits_and_records_progress() {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_search()
            .withf(|query, top_k| query == "X" && *top_k == 3)
            .returning(|_, _| Ok(vec![SearchHit::new("7", 0.82, "X is a thing")]));

        let state = processing_state();
        let tool = SearchTool::new(Arc::new(retriever), state.clone(), 3);

        let result = tool.invoke(json!({"query": "X"})).await.unwrap();

        assert_eq!(result[0]["id"], "7");
        assert_eq!(result[0]["chunk"], "X is a thing");

        let steps = state.lock().await.latest_progress().current_state;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1], ProgressStep::new("search: X", ProgressState::Done));
    }

    #[tokio::test]
    async fn test_explicit_top_k_overrides_default() {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_search()
            .withf(|_, top_k| *top_k == 5)
            .returning(|_, _| Ok(vec![]));

        let tool = SearchTool::new(Arc::new(retriever), processing_state(), 3);
        let result = tool.invoke(json!({"query": "X", "topK": 5})).await.unwrap();

        assert_eq!(result, json!([]));
    }

    #[tokio::test]
    async fn test_failed_search_is_retried_then_marked_failed() {
        let mut retriever = MockRetriever::new();
        retriever
            .expect_search()
            .times(2)
            .returning(|_, _| Err(DomainError::provider("azure_openai", "HTTP 503")));

        let state = processing_state();
        let tool = SearchTool::new(Arc::new(retriever), state.clone(), 3).with_retry(fast_retry());

        let err = tool.invoke(json!({"query": "X"})).await.unwrap_err();

        assert!(matches!(err, DomainError::Provider { .. }));
        let steps = state.lock().await.latest_progress().current_state;
        assert_eq!(steps[1].state, ProgressState::Failed);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tool = SearchTool::new(Arc::new(MockRetriever::new()), processing_state(), 3);

        assert!(matches!(
            tool.invoke(json!({"topK": 2})).await,
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            tool.invoke(json!({"query": "X", "topK": 0})).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_definition_advertises_default_top_k() {
        let tool = SearchTool::new(Arc::new(MockRetriever::new()), processing_state(), 4);
        let definition = tool.definition();

        assert_eq!(definition.name, SEARCH_TOOL_NAME);
        assert_eq!(definition.parameters["properties"]["topK"]["default"], 4);
    }
}
