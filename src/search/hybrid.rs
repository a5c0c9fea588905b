//! Hybrid retrieval: weighted fusion of dense (cosine) and sparse (BM25) scores.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::bm25::Bm25Index;
use super::vector::VectorIndex;
use super::{tokenizer, DocKind};

/// Which retrieval side(s) to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Hybrid,
    Dense,
    Sparse,
}

/// A fused retrieval hit. Scores are meaningful only within one result set.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub doc_id: String,
    pub kind: DocKind,
    pub content: String,
    pub metadata: Value,
    pub dense_score: f64,
    pub sparse_score: f64,
    pub fused_score: f64,
    /// 1-based position in the final ranking
    pub rank: usize,
}

/// Search counters exposed through `Stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrieverStats {
    pub total_searches: u64,
    pub last_query: Option<String>,
}

pub struct HybridRetriever {
    bm25: Bm25Index,
    vector: VectorIndex,
    w_dense: f64,
    w_sparse: f64,
    normalize_scores: bool,
    stats: Mutex<RetrieverStats>,
}

impl HybridRetriever {
    /// Default weighting: 0.7 dense / 0.3 sparse, raw scores.
    pub fn new(bm25: Bm25Index, vector: VectorIndex) -> Self {
        Self::with_weights(bm25, vector, 0.7, 0.3, false)
    }

    /// An unnormalized weight pair is rescaled by its sum.
    pub fn with_weights(bm25: Bm25Index, vector: VectorIndex, w_dense: f64, w_sparse: f64, normalize_scores: bool) -> Self {
        let sum = w_dense + w_sparse;
        let (w_dense, w_sparse) = if sum > 0.0 && (sum - 1.0).abs() > f64::EPSILON {
            log::warn!("hybrid weights sum to {:.3}; renormalizing", sum);
            (w_dense / sum, w_sparse / sum)
        } else if sum <= 0.0 {
            log::warn!("non-positive hybrid weights; using defaults");
            (0.7, 0.3)
        } else {
            (w_dense, w_sparse)
        };

        Self {
            bm25,
            vector,
            w_dense,
            w_sparse,
            normalize_scores,
            stats: Mutex::new(RetrieverStats::default()),
        }
    }

    pub fn weights(&self) -> (f64, f64) {
        (self.w_dense, self.w_sparse)
    }

    pub fn bm25(&self) -> &Bm25Index {
        &self.bm25
    }

    pub fn stats(&self) -> RetrieverStats {
        self.stats.lock().expect("retriever stats lock poisoned").clone()
    }

    pub async fn search(&self, query: &str, k: usize, kind: Option<DocKind>, mode: SearchMode) -> Vec<RetrievalResult> {
        {
            let mut stats = self.stats.lock().expect("retriever stats lock poisoned");
            stats.total_searches += 1;
            stats.last_query = Some(query.chars().take(100).collect());
        }

        match mode {
            SearchMode::Dense => self.dense_only(query, k, kind).await,
            SearchMode::Sparse => self.sparse_only(query, k, kind),
            SearchMode::Hybrid => self.fused(query, k, kind).await,
        }
    }

    async fn dense_only(&self, query: &str, k: usize, kind: Option<DocKind>) -> Vec<RetrievalResult> {
        let hits = self.vector.search(query, k * 2).await;
        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|h| kind_matches(&h.metadata, kind))
            .take(k)
            .map(|h| RetrievalResult {
                doc_id: h.doc_id,
                kind: metadata_kind(&h.metadata),
                content: h.content,
                metadata: h.metadata,
                dense_score: h.similarity,
                sparse_score: 0.0,
                fused_score: h.similarity,
                rank: 0,
            })
            .collect();
        assign_ranks(&mut results);
        results
    }

    fn sparse_only(&self, query: &str, k: usize, kind: Option<DocKind>) -> Vec<RetrievalResult> {
        let tokens = tokenizer::tokenize(query);
        let mut results: Vec<RetrievalResult> = self
            .bm25
            .search(&tokens, k, kind)
            .into_iter()
            .map(|h| RetrievalResult {
                doc_id: h.doc_id,
                kind: h.kind,
                content: h.content,
                metadata: h.metadata,
                dense_score: 0.0,
                sparse_score: h.score,
                fused_score: h.score,
                rank: 0,
            })
            .collect();
        assign_ranks(&mut results);
        results
    }

    async fn fused(&self, query: &str, k: usize, kind: Option<DocKind>) -> Vec<RetrievalResult> {
        let dense_hits = self.vector.search(query, k * 2).await;
        let tokens = tokenizer::tokenize(query);
        let sparse_hits = self.bm25.search(&tokens, k * 2, kind);

        // Union keyed by doc_id; a missing side contributes 0. The kind
        // filter applies before fusion, so filtered docs never occupy slots.
        struct Candidate {
            kind: DocKind,
            content: String,
            metadata: Value,
            dense: f64,
            sparse: f64,
        }

        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        for hit in dense_hits {
            if !kind_matches(&hit.metadata, kind) {
                continue;
            }
            candidates.insert(
                hit.doc_id,
                Candidate {
                    kind: metadata_kind(&hit.metadata),
                    content: hit.content,
                    metadata: hit.metadata,
                    dense: hit.similarity,
                    sparse: 0.0,
                },
            );
        }

        for hit in sparse_hits {
            candidates
                .entry(hit.doc_id)
                .and_modify(|c| c.sparse = hit.score)
                .or_insert(Candidate {
                    kind: hit.kind,
                    content: hit.content,
                    metadata: hit.metadata,
                    dense: 0.0,
                    sparse: hit.score,
                });
        }

        let (dense_scores, sparse_scores): (Vec<f64>, Vec<f64>) =
            candidates.values().map(|c| (c.dense, c.sparse)).unzip();
        let dense_norm = Normalizer::new(&dense_scores, self.normalize_scores);
        let sparse_norm = Normalizer::new(&sparse_scores, self.normalize_scores);

        let mut results: Vec<RetrievalResult> = candidates
            .into_iter()
            .map(|(doc_id, c)| {
                let dense = dense_norm.apply(c.dense);
                let sparse = sparse_norm.apply(c.sparse);
                RetrievalResult {
                    doc_id,
                    kind: c.kind,
                    content: c.content,
                    metadata: c.metadata,
                    dense_score: dense,
                    sparse_score: sparse,
                    fused_score: self.w_dense * dense + self.w_sparse * sparse,
                    rank: 0,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        results.truncate(k);
        assign_ranks(&mut results);
        results
    }
}

fn assign_ranks(results: &mut [RetrievalResult]) {
    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx + 1;
    }
}

fn metadata_kind(metadata: &Value) -> DocKind {
    match metadata.get("doc_type").and_then(|v| v.as_str()) {
        Some("template") => DocKind::Template,
        // The dense store holds policy chunks unless tagged otherwise
        _ => DocKind::Policy,
    }
}

fn kind_matches(metadata: &Value, kind: Option<DocKind>) -> bool {
    kind.is_none_or(|want| metadata_kind(metadata) == want)
}

/// Optional per-side min-max normalization across the candidate union.
struct Normalizer {
    min: f64,
    range: f64,
    enabled: bool,
}

impl Normalizer {
    fn new(values: &[f64], enabled: bool) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            min,
            range: max - min,
            enabled,
        }
    }

    fn apply(&self, value: f64) -> f64 {
        if !self.enabled {
            return value;
        }
        let normalized = if self.range > 0.0 { (value - self.min) / self.range } else { 0.0 };
        if normalized.is_nan() { 0.0 } else { normalized }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::search::vector::{EmbeddingClient, InMemoryVectorStore, VectorStore};
    use crate::search::CorpusDoc;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct VocabEmbedder;

    const VOCAB: [&str; 5] = ["배송", "주문", "예약", "정책", "강의"];

    #[async_trait]
    impl EmbeddingClient for VocabEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(VOCAB.iter().map(|w| text.matches(w).count() as f32).collect())
        }
    }

    async fn retriever_with_weights(w_dense: f64, w_sparse: f64, normalize: bool) -> HybridRetriever {
        let docs = vec![
            CorpusDoc::new(
                "policy_delivery",
                DocKind::Policy,
                "배송 안내 메시지 작성 정책",
                json!({"source": "operations.md", "doc_type": "policy"}),
            ),
            CorpusDoc::new(
                "policy_order",
                DocKind::Policy,
                "주문 확인 메시지 정책 가이드",
                json!({"source": "content-guide.md", "doc_type": "policy"}),
            ),
            CorpusDoc::new(
                "template_lecture",
                DocKind::Template,
                "강의 수강 신청 완료 안내 템플릿",
                json!({"source": "templates", "doc_type": "template"}),
            ),
        ];

        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(VocabEmbedder);
        for doc in &docs {
            let vector = embedder.embed(&doc.content).await.unwrap();
            store.upsert(&doc.id, &doc.content, doc.metadata.clone(), vector).await.unwrap();
        }

        let bm25 = Bm25Index::build(docs).unwrap();
        let vector = VectorIndex::new(embedder, store);
        HybridRetriever::with_weights(bm25, vector, w_dense, w_sparse, normalize)
    }

    #[tokio::test]
    async fn test_hybrid_search_ranks_relevant_doc_first() {
        let retriever = retriever_with_weights(0.7, 0.3, false).await;
        let results = retriever.search("배송 안내", 3, None, SearchMode::Hybrid).await;

        assert!(!results.is_empty());
        assert_eq!(results[0].doc_id, "policy_delivery");
        assert_eq!(results[0].rank, 1);
        for pair in results.windows(2) {
            assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[tokio::test]
    async fn test_fused_score_is_weighted_sum() {
        let retriever = retriever_with_weights(0.7, 0.3, false).await;
        let results = retriever.search("배송 정책", 3, None, SearchMode::Hybrid).await;

        for result in &results {
            let expected = 0.7 * result.dense_score + 0.3 * result.sparse_score;
            assert!((result.fused_score - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_weight_renormalization() {
        let retriever = retriever_with_weights(7.0, 3.0, false).await;
        let (w_dense, w_sparse) = retriever.weights();
        assert!((w_dense - 0.7).abs() < 1e-9);
        assert!((w_sparse - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pure_sparse_weights_match_bm25_ranking() {
        let retriever = retriever_with_weights(0.0, 1.0, false).await;
        let hybrid = retriever.search("주문 확인 정책", 3, None, SearchMode::Hybrid).await;
        let sparse = retriever.search("주문 확인 정책", 3, None, SearchMode::Sparse).await;

        let hybrid_ids: Vec<&str> = hybrid
            .iter()
            .filter(|r| r.fused_score > 0.0)
            .map(|r| r.doc_id.as_str())
            .collect();
        let sparse_ids: Vec<&str> = sparse.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(hybrid_ids, sparse_ids);
    }

    #[tokio::test]
    async fn test_pure_dense_weights_match_dense_ranking() {
        let retriever = retriever_with_weights(1.0, 0.0, false).await;
        let hybrid = retriever.search("배송 안내", 2, None, SearchMode::Hybrid).await;
        let dense = retriever.search("배송 안내", 2, None, SearchMode::Dense).await;

        assert_eq!(hybrid[0].doc_id, dense[0].doc_id);
    }

    #[tokio::test]
    async fn test_doc_kind_filter_applied_before_fusion() {
        let retriever = retriever_with_weights(0.7, 0.3, false).await;
        let results = retriever
            .search("강의 안내", 3, Some(DocKind::Template), SearchMode::Hybrid)
            .await;

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.kind == DocKind::Template));
        // Ranks are contiguous from 1 even though policies matched too
        assert_eq!(results[0].rank, 1);
    }

    #[tokio::test]
    async fn test_one_sided_candidates_still_fuse() {
        let retriever = retriever_with_weights(0.7, 0.3, false).await;
        // "수강" appears only in the template text; the vocab embedder cannot
        // see it, so only the sparse side produces candidates
        let results = retriever.search("수강 신청", 3, None, SearchMode::Hybrid).await;

        assert!(!results.is_empty());
        assert_eq!(results[0].doc_id, "template_lecture");
        assert_eq!(results[0].dense_score, 0.0);
        assert!(results[0].sparse_score > 0.0);
    }

    #[tokio::test]
    async fn test_normalization_bounds_scores() {
        let retriever = retriever_with_weights(0.5, 0.5, true).await;
        let results = retriever.search("배송 주문 정책", 3, None, SearchMode::Hybrid).await;

        for result in &results {
            assert!((0.0..=1.0).contains(&result.dense_score));
            assert!((0.0..=1.0).contains(&result.sparse_score));
            assert!((0.0..=1.0).contains(&result.fused_score));
        }
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let retriever = retriever_with_weights(0.7, 0.3, false).await;
        retriever.search("배송", 3, None, SearchMode::Hybrid).await;
        retriever.search("주문", 3, None, SearchMode::Sparse).await;

        let stats = retriever.stats();
        assert_eq!(stats.total_searches, 2);
        assert_eq!(stats.last_query.as_deref(), Some("주문"));
    }
}
