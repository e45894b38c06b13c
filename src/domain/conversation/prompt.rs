use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Number of search results requested when the caller does not specify one
pub const DEFAULT_RESULT_COUNT: u32 = 3;

fn default_result_count() -> u32 {
    DEFAULT_RESULT_COUNT
}

/// One pending unit of work submitted to a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    query: String,
    #[serde(default = "default_result_count")]
    result_count: u32,
}

impl PromptItem {
    /// Validates the query is non-blank and the result count is at least one
    pub fn new(query: impl Into<String>, result_count: u32) -> Result<Self, DomainError> {
        let query = query.into();

        if query.trim().is_empty() {
            return Err(DomainError::validation("Prompt must not be empty"));
        }

        if result_count < 1 {
            return Err(DomainError::validation(format!(
                "Result count must be at least 1, got {}",
                result_count
            )));
        }

        Ok(Self {
            query,
            result_count,
        })
    }

    pub fn with_default_count(query: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(query, DEFAULT_RESULT_COUNT)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn result_count(&self) -> u32 {
        self.result_count
    }
}

/// FIFO buffer of prompts waiting for the coordinator loop
#[derive(Debug, Clone, Default)]
pub struct PromptQueue {
    items: VecDeque<PromptItem>,
}

impl PromptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends at the tail and returns the 1-based position of the new item
    pub fn push(&mut self, item: PromptItem) -> usize {
        self.items.push_back(item);
        self.items.len()
    }

    pub fn pop(&mut self) -> Option<PromptItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
