//! Public API facade: one primary operation (generate) plus the secondary
//! tooling operations. An external transport owns serialization and HTTP.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::analyzer::RequestAnalyzer;
use crate::cache::{CacheStats, ResultCache};
use crate::compliance::{self, ComplianceChecker};
use crate::config::Config;
use crate::domain::template::extract_variables;
use crate::domain::{
    analysis::categories, Analysis, ApprovedTemplate, BusinessType, ComplianceVerdict,
    GenerationMethod, PolicyChunk, ServiceType, Template, TemplateMetadata, TemplateRequest,
};
use crate::error::Result;
use crate::generator::TemplateGenerator;
use crate::llm::{ChatClient, LlmOps};
use crate::rag::{PolicyContextBuilder, TemplateStore};
use crate::search::bm25::IndexStats;
use crate::search::hybrid::RetrieverStats;
use crate::search::{Bm25Index, CorpusDoc, DocKind, EmbeddingClient, HybridRetriever, VectorIndex, VectorStore};
use crate::workflow::{GenerationResult, WorkflowEngine};

/// Verdict plus rendered report, returned by `validate_template`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub compliance: ComplianceVerdict,
    pub report: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Categories {
    pub category_1_options: Vec<String>,
    pub category_2_options: Vec<String>,
    pub business_types: Vec<BusinessType>,
    pub service_types: Vec<ServiceType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub index_documents: usize,
    pub vector_documents: usize,
    pub llm_ready: bool,
    pub template_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub total_requests: u64,
    pub cache: CacheStats,
    pub index: IndexStats,
    pub retrieval: RetrieverStats,
}

pub struct TemplateService {
    engine: WorkflowEngine,
    checker: ComplianceChecker,
    retriever: Arc<HybridRetriever>,
    vector: VectorIndex,
    store: Arc<TemplateStore>,
    cache: Arc<ResultCache>,
    ops: Arc<LlmOps>,
    total_requests: AtomicU64,
}

impl TemplateService {
    /// Wire the full pipeline over the supplied collaborators. The corpus is
    /// indexed for sparse retrieval and upserted into the vector store;
    /// an empty corpus is fatal (`IndexBuild`), per-document dense failures
    /// only degrade dense retrieval.
    pub async fn new(
        config: &Config,
        chat: Arc<dyn ChatClient>,
        embedder: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        chunks: Vec<PolicyChunk>,
        templates: Vec<ApprovedTemplate>,
    ) -> Result<Self> {
        let mut docs: Vec<CorpusDoc> = chunks
            .iter()
            .map(|chunk| {
                CorpusDoc::new(
                    format!("{}#{}", chunk.source, chunk.chunk_index),
                    DocKind::Policy,
                    chunk.content.clone(),
                    serde_json::json!({
                        "source": chunk.source,
                        "policy_type": chunk.policy_type,
                        "chunk_index": chunk.chunk_index,
                        "doc_type": "policy",
                    }),
                )
            })
            .collect();
        docs.extend(templates.iter().map(|t| {
            CorpusDoc::new(
                t.id.clone(),
                DocKind::Template,
                t.text.clone(),
                serde_json::json!({
                    "source": "approved_templates",
                    "business_type": t.metadata.business_type,
                    "service_type": t.metadata.service_type,
                    "doc_type": "template",
                }),
            )
        }));

        let bm25 = Bm25Index::build(docs)?;

        let vector = VectorIndex::new(embedder, vector_store);
        for chunk in &chunks {
            let doc_id = format!("{}#{}", chunk.source, chunk.chunk_index);
            let metadata = serde_json::json!({
                "source": chunk.source,
                "policy_type": chunk.policy_type,
                "doc_type": "policy",
            });
            if let Err(e) = vector.upsert(&doc_id, &chunk.content, metadata).await {
                log::warn!("dense ingest skipped for {}: {}", doc_id, e);
            }
        }
        log::info!(
            "service initialized: {} policy chunks, {} templates, {} dense vectors",
            chunks.len(),
            templates.len(),
            vector.stored_count().await,
        );

        let retriever = Arc::new(HybridRetriever::with_weights(
            bm25,
            vector.clone(),
            config.retrieval.vector_weight,
            config.retrieval.bm25_weight,
            config.retrieval.normalize_scores,
        ));

        let ops = Arc::new(LlmOps::new(chat));
        let cache = Arc::new(ResultCache::with_config(
            config.cache.max_items,
            std::time::Duration::from_secs(config.cache.ttl_seconds),
        ));
        let store = Arc::new(TemplateStore::new(templates));

        let engine = WorkflowEngine::new(
            Arc::new(RequestAnalyzer::new(ops.clone(), cache.clone())),
            Arc::new(PolicyContextBuilder::new(retriever.clone())),
            Arc::new(TemplateGenerator::new(ops.clone(), store.clone(), cache.clone())),
            Arc::new(ComplianceChecker::new(ops.clone())),
            store.clone(),
            config.workflow.clone(),
        );

        Ok(Self {
            engine,
            checker: ComplianceChecker::new(ops.clone()),
            retriever,
            vector,
            store,
            cache,
            ops,
            total_requests: AtomicU64::new(0),
        })
    }

    /// Primary operation: generate a template for a validated request.
    pub async fn generate(&self, request: &TemplateRequest) -> Result<GenerationResult> {
        request.validate()?;
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        Ok(self.engine.run(request).await)
    }

    /// Check caller-supplied template text against the full compliance stack.
    pub async fn validate_template(
        &self,
        template_text: &str,
        variables: Option<Vec<String>>,
        business_type: Option<BusinessType>,
        button_text: Option<String>,
    ) -> ValidationReport {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let analysis = Analysis {
            business_type: business_type.unwrap_or_default(),
            ..Analysis::default()
        };
        let variables = variables.unwrap_or_else(|| extract_variables(template_text));
        let template = Template {
            text: template_text.to_string(),
            variables,
            button_suggestion: button_text,
            metadata: TemplateMetadata {
                category_1: analysis.estimated_category.category_1.clone(),
                category_2: analysis.estimated_category.category_2.clone(),
                business_type: analysis.business_type,
                service_type: analysis.service_type,
                estimated_length: template_text.chars().count(),
                variable_count: extract_variables(template_text).len(),
                target_audience: analysis.target_audience.clone(),
                tone: analysis.tone,
                generation_method: GenerationMethod::AiGenerated,
            },
        };

        let (compliance, _) = self.checker.check(&template).await;
        let report = compliance::render_report(&compliance);
        ValidationReport { compliance, report }
    }

    /// Approved few-shot examples for a business type.
    pub fn search_examples(&self, business_type: BusinessType, limit: usize) -> Vec<ApprovedTemplate> {
        self.store.by_business_type(business_type, limit)
    }

    pub fn list_categories(&self) -> Categories {
        Categories {
            category_1_options: categories::CATEGORY_1_OPTIONS.iter().map(|s| s.to_string()).collect(),
            category_2_options: categories::CATEGORY_2_OPTIONS.iter().map(|s| s.to_string()).collect(),
            business_types: BusinessType::ALL.to_vec(),
            service_types: ServiceType::ALL.to_vec(),
        }
    }

    pub async fn health_check(&self) -> HealthStatus {
        let index = self.retriever.bm25().stats();
        let vector_documents = self.vector.stored_count().await;
        let llm_ready = self.ops.is_ready();

        let status = if llm_ready && index.total_documents > 0 {
            "ok"
        } else {
            "degraded"
        };

        HealthStatus {
            status: status.to_string(),
            index_documents: index.total_documents,
            vector_documents,
            llm_ready,
            template_count: self.store.len(),
        }
    }

    pub fn stats(&self) -> SystemStats {
        SystemStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache: self.cache.stats(),
            index: self.retriever.bm25().stats(),
            retrieval: self.retriever.stats(),
        }
    }
}
