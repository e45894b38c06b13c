//! Embedding request and response types

use serde::{Deserialize, Serialize};

/// Request to embed one or more texts with a single deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    deployment: String,
    inputs: Vec<String>,
}

impl EmbeddingRequest {
    pub fn single(deployment: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            inputs: vec![text.into()],
        }
    }

    pub fn batch(deployment: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            deployment: deployment.into(),
            inputs: texts,
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }
}

/// Embedding vectors, in the same order as the request inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    vectors: Vec<Vec<f32>>,
    total_tokens: u32,
}

impl EmbeddingResponse {
    pub fn new(vectors: Vec<Vec<f32>>, total_tokens: u32) -> Self {
        Self {
            vectors,
            total_tokens,
        }
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    /// First vector (for single input requests)
    pub fn first(&self) -> Option<&[f32]> {
        self.vectors.first().map(Vec::as_slice)
    }

    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.vectors
    }
}

/// Cosine similarity in [-1, 1]; 0.0 for empty, mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
