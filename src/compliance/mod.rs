//! Compliance checking: deterministic rules, advisory LLM review, and the
//! aggregation that turns both into a single verdict.

pub mod reviewer;
pub mod rules;

pub use reviewer::LlmReviewer;
pub use rules::{check_basic, check_blacklist, check_variables, SubCheck};

use std::sync::Arc;

use crate::domain::{ApprovalProbability, ComplianceVerdict, DetailedScores, Template};
use crate::llm::{LlmOps, ReviewOutcome};

/// Sub-check weights. The blacklist dominates; the model review is advisory.
const W_BASIC: f64 = 0.30;
const W_BLACKLIST: f64 = 0.40;
const W_VARIABLES: f64 = 0.20;
const W_LLM: f64 = 0.10;

/// Substrings that mark a violation as critical. Any critical violation
/// forces `required_changes` and blocks compliance outright.
const CRITICAL_MARKERS: [&str; 5] = ["블랙리스트", "광고성", "변수만으로", "길이 초과", "변수 개수"];

pub struct ComplianceChecker {
    reviewer: LlmReviewer,
}

impl ComplianceChecker {
    pub fn new(ops: Arc<LlmOps>) -> Self {
        Self {
            reviewer: LlmReviewer::new(ops),
        }
    }

    /// Run all checks on a template and aggregate the verdict. The error
    /// annotation reports a degraded (neutral) LLM review.
    pub async fn check(&self, template: &Template) -> (ComplianceVerdict, Option<String>) {
        if template.text.trim().is_empty() {
            return (ComplianceVerdict::failed("템플릿 텍스트가 없습니다"), None);
        }

        let basic = check_basic(&template.text);
        let blacklist = check_blacklist(&template.text);
        let variables = check_variables(&template.text, template.button_suggestion.as_deref());
        let (review, review_error) = self.reviewer.review(&template.text).await;

        (aggregate(basic, blacklist, variables, review), review_error)
    }
}

/// Stateless combination of the sub-check results into the final verdict.
pub fn aggregate(basic: SubCheck, blacklist: SubCheck, variables: SubCheck, review: ReviewOutcome) -> ComplianceVerdict {
    let compliance_score = round1(
        basic.score * W_BASIC
            + blacklist.score * W_BLACKLIST
            + variables.score * W_VARIABLES
            + review.compliance_score * W_LLM,
    );

    let mut violations = Vec::new();
    violations.extend(basic.violations);
    violations.extend(blacklist.violations);
    violations.extend(variables.violations);
    violations.extend(review.violations);

    let mut warnings = Vec::new();
    warnings.extend(basic.warnings);
    warnings.extend(variables.warnings);

    let required_changes: Vec<String> = violations
        .iter()
        .filter(|v| CRITICAL_MARKERS.iter().any(|m| v.contains(m)))
        .cloned()
        .collect();

    let mut recommendations = recommend(&violations, &warnings);
    for recommendation in review.recommendations {
        if !recommendations.contains(&recommendation) {
            recommendations.push(recommendation);
        }
    }

    let approval_probability = if !required_changes.is_empty() {
        ApprovalProbability::Low
    } else if compliance_score >= 90.0 {
        ApprovalProbability::High
    } else if compliance_score >= 75.0 {
        ApprovalProbability::Medium
    } else {
        ApprovalProbability::Low
    };

    ComplianceVerdict {
        is_compliant: required_changes.is_empty() && compliance_score >= 80.0,
        compliance_score,
        violations,
        warnings,
        recommendations,
        approval_probability,
        required_changes,
        detailed_scores: DetailedScores {
            basic_rules: basic.score,
            blacklist_check: blacklist.score,
            variable_usage: variables.score,
            llm_analysis: review.compliance_score,
        },
    }
}

/// Fixed violation→phrase table, deduplicated in order.
fn recommend(violations: &[String], warnings: &[String]) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut push = |msg: &str| {
        let msg = msg.to_string();
        if !recommendations.contains(&msg) {
            recommendations.push(msg);
        }
    };

    for violation in violations {
        if violation.contains("광고성") {
            push("광고성 표현을 제거하고 순수 정보성 내용으로 수정하세요");
        } else if violation.contains("길이 초과") {
            push("메시지 길이를 1000자 이내로 줄이세요");
        } else if violation.contains("블랙리스트") {
            push("금지된 표현 유형을 제거하세요");
        } else if violation.contains("정보성 메시지") {
            push("메시지 하단에 정보성 메시지 표시를 추가하세요");
        } else if violation.contains("변수") {
            push("변수 사용 규칙을 확인하고 수정하세요");
        }
    }

    for warning in warnings {
        if warning.contains("인사말") {
            push("메시지 시작에 적절한 인사말을 추가하세요");
        }
    }

    recommendations
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Human-readable verdict report (ValidateTemplate).
pub fn render_report(verdict: &ComplianceVerdict) -> String {
    let probability = match verdict.approval_probability {
        ApprovalProbability::High => "높음",
        ApprovalProbability::Medium => "보통",
        ApprovalProbability::Low => "낮음",
    };

    let mut report = format!(
        "## 카카오 알림톡 정책 준수 검증 결과\n\n\
         ### 종합 평가\n\
         - 준수 여부: {}\n\
         - 준수 점수: {}/100점\n\
         - 승인 가능성: {}\n\n\
         ### 세부 점수\n\
         - 기본 규칙: {}/100점\n\
         - 블랙리스트 검증: {}/100점\n\
         - 변수 사용: {}/100점\n\
         - AI 분석: {}/100점\n",
        if verdict.is_compliant { "준수" } else { "위반" },
        verdict.compliance_score,
        probability,
        verdict.detailed_scores.basic_rules,
        verdict.detailed_scores.blacklist_check,
        verdict.detailed_scores.variable_usage,
        verdict.detailed_scores.llm_analysis,
    );

    if !verdict.violations.is_empty() {
        report.push_str(&format!("\n### 위반사항 ({}건)\n", verdict.violations.len()));
        for (i, violation) in verdict.violations.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, violation));
        }
    }

    if !verdict.warnings.is_empty() {
        report.push_str(&format!("\n### 경고사항 ({}건)\n", verdict.warnings.len()));
        for (i, warning) in verdict.warnings.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, warning));
        }
    }

    if !verdict.recommendations.is_empty() {
        report.push_str("\n### 개선 권장사항\n");
        for (i, recommendation) in verdict.recommendations.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, recommendation));
        }
    }

    if !verdict.required_changes.is_empty() {
        report.push_str("\n### 필수 수정사항\n");
        for (i, change) in verdict.required_changes.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, change));
        }
    }

    report
}
