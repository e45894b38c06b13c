//! Embedding provider domain models and traits

mod provider;
mod types;

pub use provider::EmbeddingProvider;
pub use types::{cosine_similarity, EmbeddingRequest, EmbeddingResponse};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
