//! Semantic search domain: indexed chunks, ranked hits and the retriever contract

mod ranking;
mod retriever;

pub use ranking::rank;
pub use retriever::Retriever;

#[cfg(test)]
pub use retriever::MockRetriever;

use serde::{Deserialize, Deserializer, Serialize};

/// Chunk ids are strings, but corpora often store them as JSON numbers
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Document chunk as read from the source corpus, before embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub chunk: String,
}

/// Chunk persisted in the search index together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub chunk: String,
    pub embedding: Vec<f32>,
}

/// Ranked search result returned to the agent tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub chunk: String,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, score: f32, chunk: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score,
            chunk: chunk.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ids_are_accepted() {
        let docs: Vec<SourceDocument> =
            serde_json::from_str(r#"[{"id": 1, "chunk": "a"}, {"id": "two", "chunk": "b"}]"#).unwrap();

        assert_eq!(docs[0].id, "1");
        assert_eq!(docs[1].id, "two");
    }
}
