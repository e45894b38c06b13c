//! QnA Agent
//!
//! Retrieval-augmented question answering over a local document corpus:
//! - One signal-driven coordinator per conversation, hosted on a tokio task
//! - Tool-calling agent on Azure OpenAI chat completions
//! - Embedding search over a JSON index built by the `index` command
//! - HTTP dispatch layer addressing conversations by workflow id

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use api::AppState;
use domain::{EmbeddingProvider, Generator, LlmProvider, Retriever};
use infrastructure::{
    agent::{LlmAgent, LlmAgentConfig},
    embedding::AzureOpenAiEmbeddingProvider,
    llm::{AzureOpenAiConfig, AzureOpenAiProvider, HttpClient},
    observability::MetricsObserver,
    search::{load_index, EmbeddingRetriever},
    services::ConversationRegistry,
};

/// Everything the server shares between requests
pub struct AppServices {
    pub state: AppState,
    pub registry: Arc<ConversationRegistry>,
}

/// Embedding provider for the configured embeddings resource
pub fn create_embedding_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let settings = &config.azure_embeddings;
    let (endpoint, api_key) = settings.resolved(&config.azure_openai);

    let client = HttpClient::with_timeout(Duration::from_secs(settings.request_timeout_secs))?;
    let azure = AzureOpenAiConfig::new(endpoint, api_key).with_api_version(&settings.api_version);

    Ok(Arc::new(AzureOpenAiEmbeddingProvider::new(client, azure)))
}

fn create_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn Generator>> {
    let settings = &config.azure_openai;

    let client = HttpClient::with_timeout(Duration::from_secs(settings.request_timeout_secs))?;
    let azure = AzureOpenAiConfig::new(&settings.endpoint, &settings.api_key)
        .with_api_version(&settings.api_version);
    let provider: Arc<dyn LlmProvider> = Arc::new(AzureOpenAiProvider::new(client, azure));

    let mut agent_config = LlmAgentConfig::new(&settings.deployment)
        .with_max_tool_rounds(config.conversation.max_tool_rounds);
    agent_config.temperature = settings.temperature;
    agent_config.max_tokens = settings.max_tokens;

    Ok(Arc::new(LlmAgent::new(provider, agent_config)))
}

/// Loads the search index and wires providers, agent and dispatch layer.
///
/// Fails when credentials are missing or the index cannot be read.
pub async fn create_app_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    config.validate_for_serve()?;

    let index_path = &config.search.index_path;
    let chunks = load_index(index_path).await.with_context(|| {
        format!(
            "Search index {} could not be loaded; run the `index` command first",
            index_path.display()
        )
    })?;
    let indexed_chunks = chunks.len();
    info!(path = %index_path.display(), chunks = indexed_chunks, "Search index loaded");

    let retriever: Arc<dyn Retriever> = Arc::new(EmbeddingRetriever::new(
        create_embedding_provider(config)?,
        &config.azure_embeddings.deployment,
        chunks,
    ));

    let registry = Arc::new(
        ConversationRegistry::new(create_generator(config)?, retriever, config.coordinator_settings())
            .with_observer(Arc::new(MetricsObserver))
            .with_retention(config.retention_policy()),
    );

    info!(
        deployment = %config.azure_openai.deployment,
        mode = ?config.conversation.mode,
        "Conversation services initialized"
    );

    Ok(AppServices {
        state: AppState::new(registry.clone(), indexed_chunks),
        registry,
    })
}
