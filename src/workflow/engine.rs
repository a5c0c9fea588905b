//! Workflow engine: the bounded analyze → retrieve → generate → check loop.
//!
//! Every stage absorbs its own upstream failures behind a documented
//! fallback, records the error, and the pipeline keeps moving. A request
//! always produces a well-formed result.

use futures::join;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::analyzer::{classify_business, classify_service, RequestAnalyzer};
use crate::compliance::ComplianceChecker;
use crate::config::WorkflowConfig;
use crate::domain::{
    Analysis, BusinessType, ComplianceFeedback, ComplianceVerdict, EstimatedCategory, ServiceType,
    Template, TemplateRequest,
};
use crate::generator::TemplateGenerator;
use crate::rag::{ContextKind, PolicyContextBuilder, TemplateStore};
use crate::workflow::events::{EventLog, Stage, StageEvent};

/// The analysis fields exposed in the final result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub business_type: BusinessType,
    pub service_type: ServiceType,
    pub message_purpose: String,
    pub estimated_category: EstimatedCategory,
    pub compliance_concerns: Vec<String>,
}

impl From<&Analysis> for AnalysisSummary {
    fn from(analysis: &Analysis) -> Self {
        Self {
            business_type: analysis.business_type,
            service_type: analysis.service_type,
            message_purpose: analysis.message_purpose.clone(),
            estimated_category: analysis.estimated_category.clone(),
            compliance_concerns: analysis.compliance_concerns.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInfo {
    /// Completed generate+check rounds (1 when no refinement happened)
    pub iterations: u32,
    pub errors: Vec<String>,
    pub policy_sources: Vec<String>,
    pub events: Vec<StageEvent>,
    pub total_duration_ms: u64,
}

/// The always-well-formed result of one request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    pub template: Template,
    pub compliance: ComplianceVerdict,
    pub analysis: AnalysisSummary,
    pub workflow_info: WorkflowInfo,
}

pub struct WorkflowEngine {
    analyzer: Arc<RequestAnalyzer>,
    context_builder: Arc<PolicyContextBuilder>,
    generator: Arc<TemplateGenerator>,
    checker: Arc<ComplianceChecker>,
    store: Arc<TemplateStore>,
    config: WorkflowConfig,
}

impl WorkflowEngine {
    pub fn new(
        analyzer: Arc<RequestAnalyzer>,
        context_builder: Arc<PolicyContextBuilder>,
        generator: Arc<TemplateGenerator>,
        checker: Arc<ComplianceChecker>,
        store: Arc<TemplateStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            analyzer,
            context_builder,
            generator,
            checker,
            store,
            config,
        }
    }

    pub async fn run(&self, request: &TemplateRequest) -> GenerationResult {
        let mut events = EventLog::new();
        let mut errors: Vec<String> = Vec::new();

        let (mut analysis, context) = if self.config.overlap_analysis {
            // Retrieval starts from a keyword approximation of the request;
            // the analyzer's refined enums are merged when both finish.
            let query = retrieval_query(
                classify_business(&request.user_request).unwrap_or_default(),
                classify_service(&request.user_request).unwrap_or_default(),
            );
            let started = Instant::now();
            let (analyze_outcome, context) = join!(
                self.analyzer.analyze(request),
                self.context_builder.build(&query, ContextKind::TemplateGeneration),
            );
            let elapsed = started.elapsed().as_millis() as u64;
            let (analysis, error) = analyze_outcome;

            events.record(
                Stage::Analyzing,
                elapsed,
                json!({"business_type": analysis.business_type, "service_type": analysis.service_type, "overlapped": true}),
            );
            events.record(
                Stage::Retrieving,
                elapsed,
                json!({"query": query, "chunks": context.total_chunks, "overlapped": true}),
            );
            if let Some(error) = error {
                errors.push(error);
            }
            (analysis, context)
        } else {
            let started = Instant::now();
            let (analysis, error) = self.analyzer.analyze(request).await;
            events.record(
                Stage::Analyzing,
                started.elapsed().as_millis() as u64,
                json!({"business_type": analysis.business_type, "service_type": analysis.service_type}),
            );
            if let Some(error) = error {
                errors.push(error);
            }

            let query = retrieval_query(analysis.business_type, analysis.service_type);
            let started = Instant::now();
            let context = self.context_builder.build(&query, ContextKind::TemplateGeneration).await;
            // Sibling example fetch; informational, never fatal
            let examples = self
                .store
                .find_similar(analysis.business_type, analysis.service_type, 3);
            events.record(
                Stage::Retrieving,
                started.elapsed().as_millis() as u64,
                json!({"query": query, "chunks": context.total_chunks, "examples": examples.len()}),
            );
            (analysis, context)
        };

        let mut iterations = 0u32;
        let (template, verdict) = loop {
            iterations += 1;

            let started = Instant::now();
            let (template, generation_error) = self.generator.generate(&analysis, &context).await;
            events.record(
                Stage::Generating,
                started.elapsed().as_millis() as u64,
                json!({
                    "iteration": iterations,
                    "generation_method": template.metadata.generation_method,
                    "chars": template.char_count(),
                }),
            );
            if let Some(error) = generation_error {
                errors.push(error);
            }

            let started = Instant::now();
            let (verdict, check_error) = self.checker.check(&template).await;
            events.record(
                Stage::Checking,
                started.elapsed().as_millis() as u64,
                json!({
                    "iteration": iterations,
                    "score": verdict.compliance_score,
                    "is_compliant": verdict.is_compliant,
                }),
            );
            if let Some(error) = check_error {
                errors.push(error);
            }

            if !self.needs_refinement(&verdict, iterations) {
                break (template, verdict);
            }

            // Feedback flows forward by value into the next generation
            analysis.compliance_feedback = Some(ComplianceFeedback {
                violations: verdict.violations.clone(),
                recommendations: verdict.recommendations.clone(),
                required_changes: verdict.required_changes.clone(),
            });
            events.record(
                Stage::Refining,
                0,
                json!({"iteration": iterations, "violations": verdict.violations.len()}),
            );
        };

        events.record(Stage::Done, 0, json!({"iterations": iterations}));

        GenerationResult {
            success: errors.is_empty(),
            template,
            compliance: verdict,
            analysis: AnalysisSummary::from(&analysis),
            workflow_info: WorkflowInfo {
                iterations,
                errors,
                policy_sources: context.sources.clone(),
                total_duration_ms: events.total_duration_ms(),
                events: events.into_events(),
            },
        }
    }

    fn needs_refinement(&self, verdict: &ComplianceVerdict, iterations: u32) -> bool {
        if !self.config.auto_refinement {
            return false;
        }
        if iterations >= self.config.max_iterations {
            return false;
        }
        if verdict.compliance_score < self.config.min_compliance_score {
            return true;
        }
        self.config.strict_compliance && !verdict.required_changes.is_empty()
    }
}

fn retrieval_query(business_type: BusinessType, service_type: ServiceType) -> String {
    format!("{} {} 알림톡 템플릿 정책", business_type.korean(), service_type.korean())
}
