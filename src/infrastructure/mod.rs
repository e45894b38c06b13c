//! Infrastructure layer - External service implementations

pub mod agent;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod search;
pub mod services;
