use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{
    ConversationHistory, ConversationMode, HistoryEntry, ProgressState, ProgressStep,
    ProgressTracker, PromptItem, PromptQueue,
};
use crate::domain::llm::Message;

/// Loop state of a conversation coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Processing,
    Ended,
}

/// Acknowledgement returned to a submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 1-based queue position at the time of submission
    Queued { position: usize },
    /// The conversation was already ended or its run has terminated
    Dropped,
}

/// Prompt dequeued for processing together with the context it runs against
#[derive(Debug, Clone)]
pub struct Turn {
    pub item: PromptItem,
    /// Answered turns that preceded this prompt
    pub prior_turns: Vec<Message>,
}

/// What the loop should do after waking up
#[derive(Debug, Clone)]
pub enum LoopAction {
    Wait,
    Process(Turn),
    End,
}

/// Point-in-time view served by the progress query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestProgress {
    pub latest_message: Option<HistoryEntry>,
    pub current_state: Vec<ProgressStep>,
}

/// Full state of one conversation instance.
///
/// Mutated only by signal handlers and the coordinator loop, each call
/// running to completion under the instance lock.
#[derive(Debug, Clone)]
pub struct ConversationState {
    mode: ConversationMode,
    queue: PromptQueue,
    history: ConversationHistory,
    progress: ProgressTracker,
    ended: bool,
    phase: Phase,
    closed_at: Option<Instant>,
    processed: usize,
    dropped: usize,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::with_mode(ConversationMode::MultiTurn)
    }

    pub fn with_mode(mode: ConversationMode) -> Self {
        Self {
            mode,
            queue: PromptQueue::new(),
            history: ConversationHistory::new(),
            progress: ProgressTracker::new(),
            ended: false,
            phase: Phase::Waiting,
            closed_at: None,
            processed: 0,
            dropped: 0,
        }
    }

    /// Signal: enqueue a prompt unless the conversation has ended or closed
    pub fn submit(&mut self, item: PromptItem) -> SubmitOutcome {
        if self.ended || self.is_closed() {
            self.dropped += 1;
            return SubmitOutcome::Dropped;
        }

        SubmitOutcome::Queued {
            position: self.queue.push(item),
        }
    }

    /// Signal: stop dequeuing; queued prompts stay untouched
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Evaluates the wait condition.
    ///
    /// On `Process` the head of the queue has been removed, the user entry
    /// appended and the progress tracker reseeded, all in one step. A
    /// single-turn conversation counts as ended from that point on, so later
    /// submissions are dropped instead of queued behind a run that will not
    /// dequeue them.
    pub fn poll_next(&mut self) -> LoopAction {
        if self.ended {
            self.phase = Phase::Ended;
            return LoopAction::End;
        }

        let Some(item) = self.queue.pop() else {
            self.phase = Phase::Waiting;
            return LoopAction::Wait;
        };

        let prior_turns = self.history.replayable_messages();
        self.history.append(HistoryEntry::user(item.query()));
        self.progress.reset(item.query());
        self.phase = Phase::Processing;
        if self.mode == ConversationMode::SingleTurn {
            self.ended = true;
        }

        LoopAction::Process(Turn { item, prior_turns })
    }

    /// Records the answer for the prompt in flight
    pub fn complete(&mut self, answer: impl Into<String>) {
        self.history.append(HistoryEntry::agent(answer));
        self.progress.finish(ProgressState::Done);
        self.processed += 1;
        self.phase = self.phase_after_turn();
    }

    /// Records a terminal failure for the prompt in flight
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.history.append(HistoryEntry::system(reason));
        self.progress.finish(ProgressState::Failed);
        self.processed += 1;
        self.phase = self.phase_after_turn();
    }

    fn phase_after_turn(&self) -> Phase {
        if self.ended {
            Phase::Ended
        } else {
            Phase::Waiting
        }
    }

    /// Marks the run as terminated; no further signals are accepted by the dispatcher
    pub fn close(&mut self) {
        self.phase = Phase::Ended;
        self.closed_at.get_or_insert_with(Instant::now);
    }

    pub fn push_progress(&mut self, step: ProgressStep) -> usize {
        self.progress.push(step)
    }

    pub fn update_progress(&mut self, index: usize, state: ProgressState) -> bool {
        self.progress.update(index, state)
    }

    /// Records a failed attempt of the prompt in flight, closing the sub-steps it abandoned
    pub fn record_failed_attempt(&mut self, content: impl Into<String>) {
        self.progress.fail_running();
        self.progress
            .push(ProgressStep::new(content, ProgressState::Failed));
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn latest_progress(&self) -> LatestProgress {
        LatestProgress {
            latest_message: self.history.last().cloned(),
            current_state: self.progress.snapshot(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn closed_at(&self) -> Option<Instant> {
        self.closed_at
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
