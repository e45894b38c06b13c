//! LLM provider implementations

mod azure_openai;
mod http_client;

pub use azure_openai::{AzureOpenAiConfig, AzureOpenAiProvider, DEFAULT_API_VERSION};
pub use http_client::{HttpClient, HttpClientTrait};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
