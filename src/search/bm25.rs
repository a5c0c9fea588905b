//! In-process Okapi BM25 index over the tokenized policy/template corpus.
//!
//! The index is immutable after `build`; readers need no locking.

use serde::Serialize;
use std::collections::HashMap;

use super::{CorpusDoc, DocKind};
use crate::error::{AlimgenError, Result};

/// Term-frequency saturation parameter.
const DEFAULT_K1: f64 = 1.2;
/// Field-length normalization parameter.
const DEFAULT_B: f64 = 0.75;

/// One search hit with the owning document's identity and content.
#[derive(Debug, Clone)]
pub struct Bm25Hit {
    pub doc_id: String,
    pub kind: DocKind,
    pub content: String,
    pub metadata: serde_json::Value,
    pub score: f64,
}

/// Corpus statistics, exposed through the service's diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub template_count: usize,
    pub policy_count: usize,
    pub total_tokens: usize,
    pub average_tokens_per_doc: f64,
}

/// Why a document scored the way it did for a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreExplanation {
    pub matching_tokens: Vec<String>,
    pub match_ratio: f64,
    pub score: f64,
    pub doc_token_count: usize,
    pub kind: DocKind,
}

pub struct Bm25Index {
    k1: f64,
    b: f64,
    docs: Vec<CorpusDoc>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

impl Bm25Index {
    /// Build with the standard Okapi parameters (k1 = 1.2, b = 0.75).
    pub fn build(docs: Vec<CorpusDoc>) -> Result<Self> {
        Self::with_params(docs, DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(docs: Vec<CorpusDoc>, k1: f64, b: f64) -> Result<Self> {
        if docs.is_empty() {
            return Err(AlimgenError::IndexBuild(
                "cannot build BM25 index over an empty corpus".to_string(),
            ));
        }

        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for doc in &docs {
            total_tokens += doc.tokens.len();
            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in &doc.tokens {
                *tf.entry(token.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let avg_doc_len = total_tokens as f64 / docs.len() as f64;

        Ok(Self {
            k1,
            b,
            docs,
            term_freqs,
            doc_freq,
            avg_doc_len,
        })
    }

    /// BM25 scores for every document, aligned with insertion order.
    pub fn score(&self, query_tokens: &[String]) -> Vec<f64> {
        let n = self.docs.len() as f64;

        self.docs
            .iter()
            .enumerate()
            .map(|(idx, doc)| {
                let tf_map = &self.term_freqs[idx];
                let doc_len = doc.tokens.len() as f64;
                let norm = self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len.max(f64::EPSILON));

                query_tokens
                    .iter()
                    .map(|term| {
                        let tf = *tf_map.get(term).unwrap_or(&0) as f64;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
                        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                        idf * tf * (self.k1 + 1.0) / (tf + norm)
                    })
                    .sum()
            })
            .collect()
    }

    /// Top-k positive-scoring documents, score descending, ties broken by
    /// insertion order. An unmatched `kind` filter yields an empty result.
    pub fn search(&self, query_tokens: &[String], k: usize, kind: Option<DocKind>) -> Vec<Bm25Hit> {
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let scores = self.score(query_tokens);
        let mut scored: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| kind.is_none_or(|want| self.docs[*idx].kind == want))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(idx, score)| {
                let doc = &self.docs[idx];
                Bm25Hit {
                    doc_id: doc.id.clone(),
                    kind: doc.kind,
                    content: doc.content.clone(),
                    metadata: doc.metadata.clone(),
                    score,
                }
            })
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let total_tokens: usize = self.docs.iter().map(|d| d.tokens.len()).sum();
        IndexStats {
            total_documents: self.docs.len(),
            template_count: self.docs.iter().filter(|d| d.kind == DocKind::Template).count(),
            policy_count: self.docs.iter().filter(|d| d.kind == DocKind::Policy).count(),
            total_tokens,
            average_tokens_per_doc: total_tokens as f64 / self.docs.len() as f64,
        }
    }

    /// Diagnostic breakdown for a single document against a query.
    pub fn explain(&self, query_tokens: &[String], doc_id: &str) -> Option<ScoreExplanation> {
        let idx = self.docs.iter().position(|d| d.id == doc_id)?;
        let doc = &self.docs[idx];

        let matching_tokens: Vec<String> = query_tokens
            .iter()
            .filter(|t| doc.tokens.contains(t))
            .cloned()
            .collect();

        let score = self.score(query_tokens)[idx];

        Some(ScoreExplanation {
            match_ratio: if query_tokens.is_empty() {
                0.0
            } else {
                matching_tokens.len() as f64 / query_tokens.len() as f64
            },
            matching_tokens,
            score,
            doc_token_count: doc.tokens.len(),
            kind: doc.kind,
        })
    }
}
