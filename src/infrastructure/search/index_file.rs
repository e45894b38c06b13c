use std::path::Path;

use serde::de::DeserializeOwned;

use crate::domain::search::{IndexedChunk, SourceDocument};
use crate::domain::DomainError;

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        DomainError::storage(format!("Failed to read '{}': {}", path.display(), e))
    })?;

    serde_json::from_slice(&raw).map_err(|e| {
        DomainError::storage(format!("Invalid JSON in '{}': {}", path.display(), e))
    })
}

/// Loads `[{id, chunk, embedding}]` records; every embedding must share one dimension
pub async fn load_index(path: &Path) -> Result<Vec<IndexedChunk>, DomainError> {
    let chunks: Vec<IndexedChunk> = read_json(path).await?;

    if let Some(first) = chunks.first() {
        let dimensions = first.embedding.len();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(DomainError::storage(format!(
                "Chunk '{}' has {} dimensions, expected {}",
                bad.id,
                bad.embedding.len(),
                dimensions
            )));
        }
    }

    tracing::info!(path = %path.display(), chunks = chunks.len(), "Loaded search index");
    Ok(chunks)
}

/// Loads the `[{id, chunk}]` source corpus
pub async fn load_documents(path: &Path) -> Result<Vec<SourceDocument>, DomainError> {
    read_json(path).await
}

pub async fn save_index(path: &Path, chunks: &[IndexedChunk]) -> Result<(), DomainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DomainError::storage(format!("Failed to create '{}': {}", parent.display(), e))
        })?;
    }

    let json = serde_json::to_vec(chunks)
        .map_err(|e| DomainError::internal(format!("Failed to serialize index: {}", e)))?;

    tokio::fs::write(path, json).await.map_err(|e| {
        DomainError::storage(format!("Failed to write '{}': {}", path.display(), e))
    })
}
