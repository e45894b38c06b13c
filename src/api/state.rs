//! Application state for shared services

use std::sync::Arc;

use crate::domain::conversation::{
    ConversationStatus, HistoryEntry, LatestProgress, PromptItem, SubmitOutcome,
};
use crate::domain::DomainError;
use crate::infrastructure::services::{ConversationRegistry, StartedConversation};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<dyn ConversationServiceTrait>,
    /// Number of chunks in the loaded search index
    pub indexed_chunks: usize,
}

impl AppState {
    pub fn new(conversations: Arc<dyn ConversationServiceTrait>, indexed_chunks: usize) -> Self {
        Self {
            conversations,
            indexed_chunks,
        }
    }
}

/// Signals and queries the HTTP layer routes to conversation instances
#[async_trait::async_trait]
pub trait ConversationServiceTrait: Send + Sync {
    async fn start(&self, workflow_id: Option<String>) -> Result<StartedConversation, DomainError>;
    async fn submit_prompt(
        &self,
        workflow_id: &str,
        item: PromptItem,
    ) -> Result<SubmitOutcome, DomainError>;
    async fn end_conversation(&self, workflow_id: &str) -> Result<(), DomainError>;
    async fn history(&self, workflow_id: &str) -> Result<Vec<HistoryEntry>, DomainError>;
    async fn latest_progress(&self, workflow_id: &str) -> Result<LatestProgress, DomainError>;
    async fn status(&self, workflow_id: &str) -> Result<ConversationStatus, DomainError>;
    async fn list_running(&self) -> Vec<String>;
}

#[async_trait::async_trait]
impl ConversationServiceTrait for ConversationRegistry {
    async fn start(&self, workflow_id: Option<String>) -> Result<StartedConversation, DomainError> {
        ConversationRegistry::start(self, workflow_id).await
    }

    async fn submit_prompt(
        &self,
        workflow_id: &str,
        item: PromptItem,
    ) -> Result<SubmitOutcome, DomainError> {
        ConversationRegistry::submit_prompt(self, workflow_id, item).await
    }

    async fn end_conversation(&self, workflow_id: &str) -> Result<(), DomainError> {
        ConversationRegistry::end_conversation(self, workflow_id).await
    }

    async fn history(&self, workflow_id: &str) -> Result<Vec<HistoryEntry>, DomainError> {
        ConversationRegistry::history(self, workflow_id).await
    }

    async fn latest_progress(&self, workflow_id: &str) -> Result<LatestProgress, DomainError> {
        ConversationRegistry::latest_progress(self, workflow_id).await
    }

    async fn status(&self, workflow_id: &str) -> Result<ConversationStatus, DomainError> {
        ConversationRegistry::status(self, workflow_id).await
    }

    async fn list_running(&self) -> Vec<String> {
        ConversationRegistry::list_running(self).await
    }
}
