//! Policy corpus types: ingested policy chunks and previously approved templates.

use serde::{Deserialize, Serialize};

use super::analysis::{BusinessType, ServiceType};

/// Source category of a policy document chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    ReviewGuidelines,
    ContentGuidelines,
    AllowedTemplates,
    ProhibitedTemplates,
    OperationalProcedures,
    ImageGuidelines,
    InfotalkGuidelines,
    PublicTemplateGuidelines,
    General,
}

impl PolicyType {
    /// Korean section title used when formatting policy context.
    pub fn title(&self) -> &'static str {
        match self {
            PolicyType::ReviewGuidelines => "심사 가이드라인",
            PolicyType::ContentGuidelines => "콘텐츠 작성 가이드",
            PolicyType::AllowedTemplates => "허용 템플릿 유형",
            PolicyType::ProhibitedTemplates => "금지 템플릿 유형",
            PolicyType::OperationalProcedures => "운영 절차",
            PolicyType::ImageGuidelines => "이미지 가이드라인",
            PolicyType::InfotalkGuidelines => "인포톡 가이드라인",
            PolicyType::PublicTemplateGuidelines => "공용 템플릿 가이드라인",
            PolicyType::General => "일반 정책",
        }
    }

    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "review_guidelines" => PolicyType::ReviewGuidelines,
            "content_guidelines" => PolicyType::ContentGuidelines,
            "allowed_templates" => PolicyType::AllowedTemplates,
            "prohibited_templates" => PolicyType::ProhibitedTemplates,
            "operational_procedures" => PolicyType::OperationalProcedures,
            "image_guidelines" => PolicyType::ImageGuidelines,
            "infotalk_guidelines" => PolicyType::InfotalkGuidelines,
            "public_template_guidelines" => PolicyType::PublicTemplateGuidelines,
            _ => PolicyType::General,
        }
    }
}

impl Default for PolicyType {
    fn default() -> Self {
        PolicyType::General
    }
}

/// Paragraph-sized unit of policy text. Created at ingestion, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyChunk {
    pub content: String,
    /// Identifier of the source document
    pub source: String,
    pub policy_type: PolicyType,
    pub chunk_index: usize,
    /// Meaningful only within a single result set
    #[serde(default)]
    pub relevance_score: f64,
}

/// Approval state of a stored template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Pending,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedTemplateMetadata {
    pub business_type: BusinessType,
    pub service_type: ServiceType,
    pub category_1: String,
    pub category_2: String,
    pub approval_status: ApprovalStatus,
}

/// A platform-approved template, used as a few-shot example during generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedTemplate {
    pub id: String,
    pub text: String,
    pub variables: Vec<String>,
    pub metadata: ApprovedTemplateMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_type_parse() {
        assert_eq!(PolicyType::parse_or_default("review_guidelines"), PolicyType::ReviewGuidelines);
        assert_eq!(PolicyType::parse_or_default("prohibited_templates"), PolicyType::ProhibitedTemplates);
        assert_eq!(PolicyType::parse_or_default("whatever"), PolicyType::General);
    }

    #[test]
    fn test_policy_type_titles_are_korean() {
        assert_eq!(PolicyType::ReviewGuidelines.title(), "심사 가이드라인");
        assert_eq!(PolicyType::General.title(), "일반 정책");
    }

    #[test]
    fn test_policy_chunk_serde() {
        let chunk = PolicyChunk {
            content: "알림톡은 정보성 메시지만 발송 가능합니다.".to_string(),
            source: "audit.md".to_string(),
            policy_type: PolicyType::ReviewGuidelines,
            chunk_index: 3,
            relevance_score: 0.82,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"review_guidelines\""));
        let back: PolicyChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_index, 3);
    }

    #[test]
    fn test_approval_status_serde() {
        let json = serde_json::to_string(&ApprovalStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
