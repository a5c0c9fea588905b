//! Retrieval layer: Korean tokenization, sparse BM25, dense vector search,
//! and weighted hybrid fusion.

pub mod bm25;
pub mod hybrid;
pub mod tokenizer;
pub mod vector;

use serde::{Deserialize, Serialize};

pub use bm25::Bm25Index;
pub use hybrid::{HybridRetriever, RetrievalResult, SearchMode};
pub use vector::{EmbeddingClient, HttpEmbeddingClient, InMemoryVectorStore, VectorIndex, VectorStore};

/// Kind of document held in the retrieval corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Template,
    Policy,
}

/// One indexable document: identity, raw content, and its token stream.
#[derive(Debug, Clone)]
pub struct CorpusDoc {
    pub id: String,
    pub kind: DocKind,
    pub content: String,
    pub metadata: serde_json::Value,
    pub tokens: Vec<String>,
}

impl CorpusDoc {
    /// Tokenize `content` and build a corpus document.
    pub fn new(id: impl Into<String>, kind: DocKind, content: impl Into<String>, metadata: serde_json::Value) -> Self {
        let content = content.into();
        let tokens = tokenizer::tokenize(&content);
        Self {
            id: id.into(),
            kind,
            content,
            metadata,
            tokens,
        }
    }
}
