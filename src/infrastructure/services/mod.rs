//! Infrastructure services

mod conversation_registry;

pub use conversation_registry::{ConversationRegistry, StartedConversation};
