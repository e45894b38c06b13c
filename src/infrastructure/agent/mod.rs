//! Generation collaborator backed by a chat completion provider

mod llm_agent;

pub use llm_agent::{LlmAgent, LlmAgentConfig};
