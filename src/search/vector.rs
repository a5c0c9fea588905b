//! Dense retrieval facade over an external embedding model and ANN store.
//!
//! Both collaborators sit behind traits so deployments can wire their own
//! engines; the in-memory cosine store covers tests and single-process use.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AlimgenError, Result};

/// Text-in / vector-out embedding model.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// One dense search hit. Similarity is cosine, clamped into [0, 1].
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub doc_id: String,
    pub content: String,
    pub metadata: Value,
    pub similarity: f64,
}

/// Approximate-nearest-neighbor store: upsert + top-k cosine search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, doc_id: &str, content: &str, metadata: Value, vector: Vec<f32>) -> Result<()>;

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>>;

    /// Number of stored vectors (health checks)
    async fn len(&self) -> usize;
}

/// Embedding client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1/embeddings";

    pub fn new(model: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AlimgenError::UpstreamTimeout(format!("embedding call exceeded {:?}", self.timeout)))?
            .map_err(|e| AlimgenError::UpstreamUnavailable(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(AlimgenError::UpstreamUnavailable(format!(
                "embedding API error {}: {}",
                status, detail
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| AlimgenError::Parse(format!("embedding response not JSON: {}", e)))?;

        let embedding = parsed["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| AlimgenError::Parse("embedding response missing data[0].embedding".to_string()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(embedding)
    }
}

/// Exact cosine store backed by a hash map. Fine for corpus sizes in the
/// thousands; production swaps in a real ANN engine behind `VectorStore`.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: Mutex<HashMap<String, StoredVector>>,
}

struct StoredVector {
    content: String,
    metadata: Value,
    vector: Vec<f32>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, doc_id: &str, content: &str, metadata: Value, vector: Vec<f32>) -> Result<()> {
        let mut entries = self.entries.lock().expect("vector store lock poisoned");
        entries.insert(
            doc_id.to_string(),
            StoredVector {
                content: content.to_string(),
                metadata,
                vector,
            },
        );
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let entries = self.entries.lock().expect("vector store lock poisoned");

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .map(|(id, stored)| VectorHit {
                doc_id: id.clone(),
                content: stored.content.clone(),
                metadata: stored.metadata.clone(),
                similarity: cosine_similarity(vector, &stored.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn len(&self) -> usize {
        self.entries.lock().expect("vector store lock poisoned").len()
    }
}

/// Cosine similarity clamped into [0, 1]; zero-length vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Dense retrieval adapter: embeds text and delegates persistence/search to
/// the external store. Search failures degrade to an empty result so hybrid
/// retrieval can fall back to BM25 only. Cloning shares both collaborators.
#[derive(Clone)]
pub struct VectorIndex {
    embedder: std::sync::Arc<dyn EmbeddingClient>,
    store: std::sync::Arc<dyn VectorStore>,
}

impl VectorIndex {
    pub fn new(embedder: std::sync::Arc<dyn EmbeddingClient>, store: std::sync::Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn upsert(&self, doc_id: &str, text: &str, metadata: Value) -> Result<()> {
        let vector = self.embedder.embed(text).await?;
        self.store.upsert(doc_id, text, metadata, vector).await
    }

    /// Top-k dense hits for a query. Returns empty and logs a warning when
    /// the embedding service or the store is unreachable.
    pub async fn search(&self, query: &str, k: usize) -> Vec<VectorHit> {
        let vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("dense search degraded to empty: {}", e);
                return Vec::new();
            }
        };

        match self.store.search(&vector, k).await {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("vector store search failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn stored_count(&self) -> usize {
        self.store.len().await
    }
}
