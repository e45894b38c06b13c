//! Dispatch layer: addressable conversation instances keyed by workflow id

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::agent::Generator;
use crate::domain::conversation::{
    generate_conversation_id, validate_conversation_id, ConversationCoordinator,
    ConversationHandle, ConversationObserver, ConversationStatus, CoordinatorSettings,
    HistoryEntry, LatestProgress, NoopObserver, PromptItem, RetentionPolicy, RunSummary,
    SubmitOutcome,
};
use crate::domain::search::Retriever;
use crate::domain::DomainError;

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedConversation {
    pub workflow_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// The id already had a live run, which was returned instead of a new one
    pub already_running: bool,
}

struct Instance {
    run_id: String,
    started_at: DateTime<Utc>,
    handle: ConversationHandle,
    task: Option<JoinHandle<RunSummary>>,
}

/// Starts conversation runs and routes signals and queries to them by id.
///
/// Completed runs stay queryable until the retention policy evicts them;
/// signals only reach live runs.
pub struct ConversationRegistry {
    generator: Arc<dyn Generator>,
    retriever: Arc<dyn Retriever>,
    settings: CoordinatorSettings,
    observer: Arc<dyn ConversationObserver>,
    retention: RetentionPolicy,
    instances: RwLock<HashMap<String, Instance>>,
    shutting_down: AtomicBool,
}

impl std::fmt::Debug for ConversationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRegistry")
            .field("settings", &self.settings)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl ConversationRegistry {
    pub fn new(
        generator: Arc<dyn Generator>,
        retriever: Arc<dyn Retriever>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            generator,
            retriever,
            settings,
            observer: Arc::new(NoopObserver),
            retention: RetentionPolicy::default(),
            instances: RwLock::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ConversationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Starts a run, or returns the live run already registered under `id`
    #[instrument(skip(self))]
    pub async fn start(&self, id: Option<String>) -> Result<StartedConversation, DomainError> {
        let workflow_id = match id {
            Some(id) => {
                validate_conversation_id(&id)?;
                id
            }
            None => generate_conversation_id(),
        };

        let mut instances = self.instances.write().await;

        // set under the write lock by shutdown, so no run can slip in after it
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(DomainError::unavailable(
                "Shutting down, no new conversations are accepted",
            ));
        }

        self.evict_completed(&mut instances).await;

        if let Some(existing) = instances.get(&workflow_id) {
            if !existing.handle.is_closed().await {
                info!(workflow_id = %workflow_id, "Conversation already running");
                return Ok(StartedConversation {
                    workflow_id,
                    run_id: existing.run_id.clone(),
                    started_at: existing.started_at,
                    already_running: true,
                });
            }
        }

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let coordinator = ConversationCoordinator::new(
            &workflow_id,
            self.generator.clone(),
            self.retriever.clone(),
            self.settings.clone(),
        )
        .with_observer(self.observer.clone());
        let (handle, task) = coordinator.spawn();

        instances.insert(
            workflow_id.clone(),
            Instance {
                run_id: run_id.clone(),
                started_at,
                handle,
                task: Some(task),
            },
        );
        info!(workflow_id = %workflow_id, run_id = %run_id, "Conversation started");

        Ok(StartedConversation {
            workflow_id,
            run_id,
            started_at,
            already_running: false,
        })
    }

    /// Drops finished runs past the retention age, then the oldest ones over the cap
    async fn evict_completed(&self, instances: &mut HashMap<String, Instance>) -> usize {
        let mut completed = Vec::new();
        for (id, instance) in instances.iter() {
            if let Some(closed_at) = instance.handle.closed_at().await {
                completed.push((closed_at, id.clone()));
            }
        }
        completed.sort();

        let excess = completed.len().saturating_sub(self.retention.max_completed);
        let evicted: Vec<String> = completed
            .into_iter()
            .enumerate()
            .filter(|(position, (closed_at, _))| {
                *position < excess || closed_at.elapsed() >= self.retention.max_age
            })
            .map(|(_, (_, id))| id)
            .collect();

        for id in &evicted {
            instances.remove(id);
        }
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "Evicted completed conversations");
        }

        evicted.len()
    }

    async fn lookup(&self, id: &str) -> Result<ConversationHandle, DomainError> {
        self.instances
            .read()
            .await
            .get(id)
            .map(|instance| instance.handle.clone())
            .ok_or_else(|| DomainError::not_found(format!("Workflow '{}' not found", id)))
    }

    async fn lookup_running(&self, id: &str) -> Result<ConversationHandle, DomainError> {
        let handle = self.lookup(id).await?;

        if handle.is_closed().await {
            return Err(DomainError::not_found(format!(
                "Workflow '{}' has already completed",
                id
            )));
        }

        Ok(handle)
    }

    #[instrument(skip(self, item))]
    pub async fn submit_prompt(
        &self,
        id: &str,
        item: PromptItem,
    ) -> Result<SubmitOutcome, DomainError> {
        let handle = self.lookup_running(id).await?;
        Ok(handle.submit_prompt(item).await)
    }

    #[instrument(skip(self))]
    pub async fn end_conversation(&self, id: &str) -> Result<(), DomainError> {
        let handle = self.lookup_running(id).await?;
        handle.end_conversation().await;
        Ok(())
    }

    pub async fn history(&self, id: &str) -> Result<Vec<HistoryEntry>, DomainError> {
        Ok(self.lookup(id).await?.history().await)
    }

    pub async fn latest_progress(&self, id: &str) -> Result<LatestProgress, DomainError> {
        Ok(self.lookup(id).await?.latest_progress().await)
    }

    pub async fn status(&self, id: &str) -> Result<ConversationStatus, DomainError> {
        Ok(self.lookup(id).await?.status().await)
    }

    /// Ids of live runs, sorted
    pub async fn list_running(&self) -> Vec<String> {
        let instances = self.instances.read().await;
        let mut ids = Vec::with_capacity(instances.len());

        for (id, instance) in instances.iter() {
            if !instance.handle.is_closed().await {
                ids.push(id.clone());
            }
        }

        ids.sort();
        ids
    }

    /// Ends every live run and waits for the loops to exit. Later starts are refused.
    pub async fn shutdown(&self) {
        let tasks: Vec<(String, JoinHandle<RunSummary>)> = {
            let mut instances = self.instances.write().await;
            self.shutting_down.store(true, Ordering::SeqCst);
            let mut tasks = Vec::new();

            for (id, instance) in instances.iter_mut() {
                instance.handle.end_conversation().await;
                if let Some(task) = instance.task.take() {
                    tasks.push((id.clone(), task));
                }
            }

            tasks
        };

        info!(conversations = tasks.len(), "Waiting for conversations to finish");

        let (ids, handles): (Vec<String>, Vec<JoinHandle<RunSummary>>) = tasks.into_iter().unzip();

        for (id, joined) in ids.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(summary) => info!(
                    workflow_id = %id,
                    processed = summary.processed,
                    left_queued = summary.left_queued,
                    "Conversation stopped"
                ),
                Err(e) => warn!(workflow_id = %id, error = %e, "Conversation task failed"),
            }
        }
    }
}
