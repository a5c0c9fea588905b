//! Compliance verdict produced by the rule checker + reviewer aggregation.

use serde::{Deserialize, Serialize};

/// Likelihood that the platform review would approve the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalProbability {
    High,
    Medium,
    Low,
}

/// Per-subcheck scores, each 0–100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetailedScores {
    pub basic_rules: f64,
    pub blacklist_check: f64,
    pub variable_usage: f64,
    pub llm_analysis: f64,
}

/// Aggregated compliance verdict.
///
/// Invariant: `is_compliant ⇔ required_changes.is_empty() ∧ compliance_score ≥ 80`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub is_compliant: bool,
    /// Weighted score, rounded to one decimal
    pub compliance_score: f64,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub approval_probability: ApprovalProbability,
    /// Violations classified as critical; must be fixed before approval
    pub required_changes: Vec<String>,
    pub detailed_scores: DetailedScores,
}

impl ComplianceVerdict {
    /// Verdict for a template that could not be checked at all.
    pub fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            is_compliant: false,
            compliance_score: 0.0,
            violations: vec![reason.clone()],
            warnings: Vec::new(),
            recommendations: vec!["전문가 검토가 필요합니다".to_string()],
            approval_probability: ApprovalProbability::Low,
            required_changes: vec![reason],
            detailed_scores: DetailedScores {
                basic_rules: 0.0,
                blacklist_check: 0.0,
                variable_usage: 0.0,
                llm_analysis: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_verdict_shape() {
        let verdict = ComplianceVerdict::failed("템플릿 텍스트가 없습니다");
        assert!(!verdict.is_compliant);
        assert_eq!(verdict.compliance_score, 0.0);
        assert_eq!(verdict.violations, verdict.required_changes);
        assert_eq!(verdict.approval_probability, ApprovalProbability::Low);
    }

    #[test]
    fn test_approval_probability_serde() {
        assert_eq!(serde_json::to_string(&ApprovalProbability::High).unwrap(), "\"high\"");
        let parsed: ApprovalProbability = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, ApprovalProbability::Medium);
    }
}
