use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryPolicy;

/// Instructions given to the generation collaborator when none are configured
pub const DEFAULT_INSTRUCTIONS: &str = "You are an assistant specialized in synthesis. \
To have a better context to answer a user question about software development/programming, \
use the 'search' tool to search for relevant documents. Respond only based on the CONTEXT \
returned by it, citing excerpts using [n] when relevant. If no external information is \
needed, just say so.";

/// Whether a conversation keeps accepting prompts after the first answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    #[default]
    MultiTurn,
    /// The run terminates after processing its first prompt
    SingleTurn,
}

/// Per-instance coordinator settings
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub mode: ConversationMode,
    pub instructions: String,
    pub generation_timeout: Duration,
    pub generation_retry: RetryPolicy,
    pub search_timeout: Duration,
    pub search_retry: RetryPolicy,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            mode: ConversationMode::default(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            generation_timeout: Duration::from_secs(30),
            generation_retry: RetryPolicy::default(),
            search_timeout: Duration::from_secs(60),
            search_retry: RetryPolicy::new(2),
        }
    }
}

impl CoordinatorSettings {
    pub fn with_mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_generation_retry(mut self, retry: RetryPolicy) -> Self {
        self.generation_retry = retry;
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_search_retry(mut self, retry: RetryPolicy) -> Self {
        self.search_retry = retry;
        self
    }

    /// Bound of one search attempt.
    ///
    /// Searches run inside a generation attempt, so each gets at most half of
    /// the generation timeout and can fail on its own before the turn does.
    pub fn search_time_box(&self) -> Duration {
        self.search_timeout.min(self.generation_timeout / 2)
    }
}

/// How long finished runs stay queryable before the dispatcher forgets them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Age after closing at which a run is evicted
    pub max_age: Duration,
    /// Finished runs kept at most; the oldest go first
    pub max_completed: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(3600),
            max_completed: 1000,
        }
    }
}
