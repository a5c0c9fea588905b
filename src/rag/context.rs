//! Policy context assembly: retrieve, deduplicate, group, format.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::domain::PolicyType;
use crate::search::{DocKind, HybridRetriever, RetrievalResult, SearchMode};

/// What the context will be used for; selects the secondary sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    TemplateGeneration,
    ComplianceCheck,
    General,
}

impl ContextKind {
    fn header(&self) -> &'static str {
        match self {
            ContextKind::TemplateGeneration => "## 카카오 알림톡 템플릿 작성 가이드",
            ContextKind::ComplianceCheck => "## 카카오 알림톡 정책 준수 기준",
            ContextKind::General => "## 카카오 알림톡 정책 정보",
        }
    }

    fn sub_queries(&self) -> &'static [&'static str] {
        match self {
            ContextKind::TemplateGeneration => {
                &["알림톡 템플릿 작성 가이드", "메시지 유형별 작성 방법", "변수 사용 규칙"]
            }
            ContextKind::ComplianceCheck => {
                &["알림톡 심사 기준", "블랙리스트 위반 사항", "승인 반려 사유"]
            }
            ContextKind::General => &["알림톡 기본 규칙", "정보성 메시지 정의"],
        }
    }
}

/// Formatted policy context handed to generation and review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    pub context_text: String,
    pub sources: Vec<String>,
    pub policy_types: Vec<PolicyType>,
    pub total_chunks: usize,
}

/// Baseline rules emitted when retrieval comes back empty.
const FALLBACK_CONTEXT: &str = "## 카카오 알림톡 기본 정책

### 기본 원칙
1. 알림톡은 정보성 메시지만 발송 가능합니다.
2. 광고성 내용은 포함할 수 없습니다.
3. 수신자가 서비스를 이용하거나 계약을 체결한 경우에만 발송 가능합니다.

### 필수 요구사항
- 메시지는 1,000자 이내로 작성해야 합니다.
- 변수는 #{변수명} 형태로 사용하며 40개를 초과할 수 없습니다.
- 정보성 메시지임을 명시해야 합니다.

### 금지사항
- 광고성 표현 (할인, 이벤트, 특가 등)
- 변수만으로 구성된 메시지
- 과도한 연락처 정보";

impl PolicyContext {
    pub fn fallback() -> Self {
        Self {
            context_text: FALLBACK_CONTEXT.to_string(),
            sources: vec!["fallback".to_string()],
            policy_types: vec![PolicyType::General],
            total_chunks: 1,
        }
    }
}

/// Upper bound on the formatted context, in characters.
const MAX_CONTEXT_CHARS: usize = 6000;
/// Retained chunks after dedup and ranking.
const MAX_CHUNKS: usize = 10;
/// Chunks rendered per policy-type group.
const MAX_CHUNKS_PER_GROUP: usize = 3;

pub struct PolicyContextBuilder {
    retriever: Arc<HybridRetriever>,
}

impl PolicyContextBuilder {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }

    /// Primary search plus context-specific sub-queries, deduplicated by a
    /// content-prefix hash, grouped by policy type, capped in size.
    pub async fn build(&self, query: &str, kind: ContextKind) -> PolicyContext {
        let mut results = self
            .retriever
            .search(query, 8, Some(DocKind::Policy), SearchMode::Hybrid)
            .await;

        for sub_query in kind.sub_queries() {
            let extra = self
                .retriever
                .search(sub_query, 3, Some(DocKind::Policy), SearchMode::Hybrid)
                .await;
            results.extend(extra);
        }

        let unique = dedupe(results);
        if unique.is_empty() {
            log::warn!("policy retrieval empty for {:?}; using fallback context", query);
            return PolicyContext::fallback();
        }

        Self::format(unique, kind)
    }

    fn format(results: Vec<RetrievalResult>, kind: ContextKind) -> PolicyContext {
        let total_chunks = results.len();

        let mut sources = Vec::new();
        let mut seen_sources = HashSet::new();
        for result in &results {
            let source = result
                .metadata
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or(&result.doc_id)
                .to_string();
            if seen_sources.insert(source.clone()) {
                sources.push(source);
            }
        }

        // BTreeMap keeps the section order stable across runs
        let mut grouped: BTreeMap<PolicyType, Vec<&RetrievalResult>> = BTreeMap::new();
        for result in &results {
            grouped.entry(chunk_policy_type(result)).or_default().push(result);
        }
        let policy_types: Vec<PolicyType> = grouped.keys().copied().collect();

        let mut parts = vec![kind.header().to_string()];
        for (policy_type, chunks) in &grouped {
            parts.push(format!("\n### {}", policy_type.title()));
            let shown = &chunks[..chunks.len().min(MAX_CHUNKS_PER_GROUP)];
            for (i, chunk) in shown.iter().enumerate() {
                parts.push(format!("\n{}", chunk.content.trim()));
                if i < shown.len() - 1 {
                    parts.push("\n---".to_string());
                }
            }
        }

        let mut context_text = parts.join("\n");
        if context_text.chars().count() > MAX_CONTEXT_CHARS {
            context_text = context_text.chars().take(MAX_CONTEXT_CHARS).collect();
        }

        PolicyContext {
            context_text,
            sources,
            policy_types,
            total_chunks,
        }
    }
}

/// Drop empty chunks, dedupe by a hash of the first 100 content chars, then
/// rank by fused score and keep the top `MAX_CHUNKS`.
fn dedupe(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RetrievalResult> = results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .filter(|r| {
            let prefix: String = r.content.chars().take(100).collect();
            seen.insert(hex::encode(Sha256::digest(prefix.as_bytes())))
        })
        .collect();

    unique.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique.truncate(MAX_CHUNKS);
    unique
}

fn chunk_policy_type(result: &RetrievalResult) -> PolicyType {
    result
        .metadata
        .get("policy_type")
        .and_then(|v| v.as_str())
        .map(PolicyType::parse_or_default)
        .unwrap_or_default()
}
