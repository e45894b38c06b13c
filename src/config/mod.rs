//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AzureEmbeddingsSettings, AzureOpenAiSettings, ConversationSettings, LogFormat,
    LoggingConfig, SearchSettings, ServerConfig,
};
