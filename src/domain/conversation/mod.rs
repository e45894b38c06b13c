//! Conversation coordinator: prompt queue, history, progress and the processing loop

mod coordinator;
mod history;
mod id;
mod observer;
mod progress;
mod prompt;
mod retry;
mod search_tool;
mod settings;
mod state;

pub use coordinator::{ConversationCoordinator, ConversationHandle, ConversationStatus, RunSummary};
pub use history::{Actor, ConversationHistory, HistoryEntry};
pub use id::{generate_conversation_id, validate_conversation_id, MAX_ID_LENGTH};
pub use observer::{ConversationObserver, NoopObserver};
pub use progress::{ProgressState, ProgressStep, ProgressTracker};
pub use prompt::{PromptItem, PromptQueue, DEFAULT_RESULT_COUNT};
pub use retry::{retry_with_timeout, retry_with_timeout_observed, Attempted, RetryPolicy};
pub use search_tool::{SearchTool, SEARCH_TOOL_NAME};
pub use settings::{ConversationMode, CoordinatorSettings, RetentionPolicy, DEFAULT_INSTRUCTIONS};
pub use state::{ConversationState, LatestProgress, LoopAction, Phase, SubmitOutcome, Turn};
