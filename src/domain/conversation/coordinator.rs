use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::retry::retry_with_timeout_observed;
use super::search_tool::SearchTool;
use super::{
    ConversationMode, ConversationObserver, ConversationState, CoordinatorSettings, HistoryEntry,
    LatestProgress, LoopAction, NoopObserver, Phase, PromptItem, SubmitOutcome, Turn,
};
use crate::domain::agent::{AgentContext, Generator, ToolSet};
use crate::domain::search::Retriever;
use crate::domain::DomainError;

/// Point-in-time summary of one conversation instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStatus {
    pub phase: Phase,
    pub running: bool,
    pub queued: usize,
    pub history_len: usize,
    pub latest: LatestProgress,
}

/// Returned by the loop once the run terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub dropped: usize,
    pub left_queued: usize,
}

/// Signal and query surface of a running (or finished) conversation.
///
/// Cheap to clone; every clone addresses the same instance.
#[derive(Clone)]
pub struct ConversationHandle {
    id: Arc<str>,
    state: Arc<Mutex<ConversationState>>,
    wake: Arc<Notify>,
    observer: Arc<dyn ConversationObserver>,
}

impl std::fmt::Debug for ConversationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ConversationHandle {
    fn new(id: &str, mode: ConversationMode, observer: Arc<dyn ConversationObserver>) -> Self {
        Self {
            id: Arc::from(id),
            state: Arc::new(Mutex::new(ConversationState::with_mode(mode))),
            wake: Arc::new(Notify::new()),
            observer,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Signal: queue a prompt. Prompts sent after the end signal, after a
    /// single-turn run took its prompt, or after the run closed are dropped.
    pub async fn submit_prompt(&self, item: PromptItem) -> SubmitOutcome {
        let outcome = self.state.lock().await.submit(item);

        match outcome {
            SubmitOutcome::Queued { position } => {
                debug!(conversation_id = %self.id, position, "Prompt queued");
                self.observer.on_submitted(&self.id);
                self.wake.notify_one();
            }
            SubmitOutcome::Dropped => {
                warn!(conversation_id = %self.id, "Conversation no longer accepts prompts, prompt dropped");
                self.observer.on_dropped(&self.id);
            }
        }

        outcome
    }

    /// Signal: request termination; queued prompts are not processed afterwards
    pub async fn end_conversation(&self) {
        self.state.lock().await.end();
        info!(conversation_id = %self.id, "End of conversation requested");
        self.wake.notify_one();
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history()
    }

    pub async fn latest_progress(&self) -> LatestProgress {
        self.state.lock().await.latest_progress()
    }

    pub async fn status(&self) -> ConversationStatus {
        let state = self.state.lock().await;

        ConversationStatus {
            phase: state.phase(),
            running: !state.is_closed(),
            queued: state.queue_len(),
            history_len: state.history_len(),
            latest: state.latest_progress(),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.is_closed()
    }

    /// When the run terminated, if it has
    pub async fn closed_at(&self) -> Option<Instant> {
        self.state.lock().await.closed_at()
    }
}

/// Owns the processing loop of one conversation instance
pub struct ConversationCoordinator {
    handle: ConversationHandle,
    generator: Arc<dyn Generator>,
    retriever: Arc<dyn Retriever>,
    settings: CoordinatorSettings,
}

impl ConversationCoordinator {
    pub fn new(
        id: &str,
        generator: Arc<dyn Generator>,
        retriever: Arc<dyn Retriever>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            handle: ConversationHandle::new(id, settings.mode, Arc::new(NoopObserver)),
            generator,
            retriever,
            settings,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ConversationObserver>) -> Self {
        self.handle.observer = observer;
        self
    }

    pub fn handle(&self) -> ConversationHandle {
        self.handle.clone()
    }

    /// Runs the loop on its own task
    pub fn spawn(self) -> (ConversationHandle, JoinHandle<RunSummary>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    #[instrument(skip(self), fields(conversation_id = %self.handle.id, mode = ?self.settings.mode))]
    pub async fn run(self) -> RunSummary {
        info!("Conversation started");
        self.handle.observer.on_started(&self.handle.id);

        // a single-turn state reports End on the poll after its only prompt
        while let Some(turn) = self.next_turn().await {
            self.process(turn).await;
        }

        let summary = {
            let mut state = self.handle.state.lock().await;
            state.close();
            RunSummary {
                processed: state.processed(),
                dropped: state.dropped(),
                left_queued: state.queue_len(),
            }
        };

        self.handle.observer.on_closed(&self.handle.id);
        info!(
            processed = summary.processed,
            left_queued = summary.left_queued,
            "Conversation closed"
        );

        summary
    }

    /// Suspends until there is a prompt to process or the conversation has ended
    async fn next_turn(&self) -> Option<Turn> {
        loop {
            let action = self.handle.state.lock().await.poll_next();

            match action {
                LoopAction::Process(turn) => return Some(turn),
                LoopAction::End => return None,
                // notify_one keeps a permit when nobody waits, so a signal that
                // lands between the check and this await still wakes us up
                LoopAction::Wait => self.handle.wake.notified().await,
            }
        }
    }

    async fn process(&self, turn: Turn) {
        let started = Instant::now();
        let query = turn.item.query().to_string();
        info!(query = %query, prior_turns = turn.prior_turns.len(), "Processing prompt");

        let search = SearchTool::new(
            self.retriever.clone(),
            self.handle.state.clone(),
            turn.item.result_count(),
        )
        .with_timeout(self.settings.search_time_box())
        .with_retry(self.settings.search_retry.clone());

        let context = AgentContext::new(&self.settings.instructions, query)
            .with_prior_turns(turn.prior_turns)
            .with_tools(ToolSet::new().with(Arc::new(search)));

        let generator = &self.generator;
        let context = &context;
        let state = &self.handle.state;

        let outcome = retry_with_timeout_observed(
            &self.settings.generation_retry,
            self.settings.generation_timeout,
            "generation",
            |_| generator.generate(context),
            |attempt, e: &DomainError| {
                let content = format!("generation attempt {} failed: {}", attempt, e);
                async move {
                    state.lock().await.record_failed_attempt(content);
                }
            },
        )
        .await;

        let attempts = outcome.attempts;
        match outcome.result {
            Ok(answer) => {
                self.handle.state.lock().await.complete(answer);
                let elapsed = started.elapsed();
                self.handle
                    .observer
                    .on_completed(&self.handle.id, elapsed, attempts);
                info!(
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Prompt answered"
                );
            }
            Err(e) => {
                let reason = format!("Failed to answer after {} attempt(s): {}", attempts, e);
                self.handle.state.lock().await.fail(&reason);
                self.handle
                    .observer
                    .on_failed(&self.handle.id, started.elapsed(), attempts);
                warn!(reason = %reason, "Prompt failed");
            }
        }
    }
}
