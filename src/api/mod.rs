//! HTTP surface of the dispatch layer

pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod workflows;

pub use router::{create_router, with_metrics};
pub use state::{AppState, ConversationServiceTrait};
