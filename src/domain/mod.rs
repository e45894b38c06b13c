//! Domain layer - Core business logic and entities

pub mod agent;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod search;

pub use agent::{AgentContext, Generator, Tool, ToolSet};
pub use conversation::{
    Actor, ConversationCoordinator, ConversationHandle, ConversationMode, ConversationObserver,
    ConversationStatus, CoordinatorSettings, HistoryEntry, LatestProgress, Phase, ProgressState,
    ProgressStep, PromptItem, RetryPolicy, SubmitOutcome,
};
pub use embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    ToolCall, ToolDefinition, Usage,
};
pub use search::{IndexedChunk, Retriever, SearchHit, SourceDocument};
