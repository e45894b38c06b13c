use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::conversation::{
    ConversationMode, CoordinatorSettings, RetentionPolicy, RetryPolicy, DEFAULT_INSTRUCTIONS,
};
use crate::domain::DomainError;
use crate::infrastructure::llm::DEFAULT_API_VERSION;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub azure_openai: AzureOpenAiSettings,
    pub azure_embeddings: AzureEmbeddingsSettings,
    pub search: SearchSettings,
    pub conversation: ConversationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Chat completions resource
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AzureOpenAiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Embeddings resource; empty endpoint or key fall back to the chat resource
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AzureEmbeddingsSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Embedded index served at runtime
    pub index_path: PathBuf,
    /// Source corpus the `index` command embeds
    pub documents_path: PathBuf,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    pub mode: ConversationMode,
    pub system_prompt: String,
    pub generation_timeout_secs: u64,
    pub max_tool_rounds: usize,
    pub retry: RetryPolicy,
    /// Seconds a finished conversation stays queryable
    pub retention_secs: u64,
    pub max_completed_runs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AzureOpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "gpt-4o".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: 60,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl Default for AzureEmbeddingsSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "text-embedding-3-large".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("database/search_index.json"),
            documents_path: PathBuf::from("database/index.json"),
            timeout_secs: 60,
            max_retries: 2,
            batch_size: 16,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            mode: ConversationMode::default(),
            system_prompt: DEFAULT_INSTRUCTIONS.to_string(),
            generation_timeout_secs: 30,
            max_tool_rounds: 5,
            retry: RetryPolicy::default(),
            retention_secs: 3600,
            max_completed_runs: 1000,
        }
    }
}

impl AzureEmbeddingsSettings {
    /// Endpoint and key to use, inheriting from the chat resource when unset
    pub fn resolved<'a>(&'a self, chat: &'a AzureOpenAiSettings) -> (&'a str, &'a str) {
        let endpoint = if self.endpoint.is_empty() {
            chat.endpoint.as_str()
        } else {
            self.endpoint.as_str()
        };
        let api_key = if self.api_key.is_empty() {
            chat.api_key.as_str()
        } else {
            self.api_key.as_str()
        };

        (endpoint, api_key)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Requirements of the `serve` command
    pub fn validate_for_serve(&self) -> Result<(), DomainError> {
        require("azure_openai.endpoint", &self.azure_openai.endpoint)?;
        require("azure_openai.api_key", &self.azure_openai.api_key)?;
        require("azure_openai.deployment", &self.azure_openai.deployment)?;
        self.validate_embeddings()?;

        if self.conversation.generation_timeout_secs == 0 || self.search.timeout_secs == 0 {
            return Err(DomainError::configuration("Timeouts must be greater than zero"));
        }

        Ok(())
    }

    /// Requirements of the `index` command
    pub fn validate_embeddings(&self) -> Result<(), DomainError> {
        let (endpoint, api_key) = self.azure_embeddings.resolved(&self.azure_openai);
        require("azure_embeddings.endpoint", endpoint)?;
        require("azure_embeddings.api_key", api_key)?;
        require("azure_embeddings.deployment", &self.azure_embeddings.deployment)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings::default()
            .with_mode(self.conversation.mode)
            .with_instructions(&self.conversation.system_prompt)
            .with_generation_timeout(Duration::from_secs(self.conversation.generation_timeout_secs))
            .with_generation_retry(self.conversation.retry.clone())
            .with_search_timeout(Duration::from_secs(self.search.timeout_secs))
            .with_search_retry(RetryPolicy {
                max_retries: self.search.max_retries,
                ..self.conversation.retry.clone()
            })
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: Duration::from_secs(self.conversation.retention_secs),
            max_completed: self.conversation.max_completed_runs,
        }
    }
}

fn require(key: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::configuration(format!("{} must be set", key)));
    }
    Ok(())
}
