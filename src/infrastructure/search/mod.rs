//! Semantic search over a JSON index file

mod embedding_retriever;
mod index_file;
mod indexer;

pub use embedding_retriever::EmbeddingRetriever;
pub use index_file::{load_documents, load_index, save_index};
pub use indexer::{IndexBuilder, IndexReport};
