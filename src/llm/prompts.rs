//! Compact per-stage prompts.
//!
//! Prompt size bounds both latency and cost, so every instruction block stays
//! minimal: the model gets the contract (exact JSON fields, closed enum
//! values) and little else.

use crate::domain::{Analysis, ApprovedTemplate};

/// Fixed core-rules phrase appended to every policy summary.
const CORE_RULES: &str = "핵심: 1000자 이내, #{변수} 형식, 정보성만, 광고 금지";

/// System prompt for request analysis: emit the Analysis JSON shape with
/// closed enum values.
pub fn analysis_system() -> String {
    r#"사용자 요청을 분석해 JSON으로만 응답:
{
  "business_type": "education|medical|restaurant|ecommerce|service|finance|other",
  "service_type": "application|reservation|order|delivery|notification|confirmation|feedback",
  "message_purpose": "목적",
  "target_audience": "대상",
  "tone": "formal|friendly|official",
  "urgency": "high|medium|low",
  "required_variables": ["수신자명"]
}"#
    .to_string()
}

pub fn analysis_user(user_request: &str) -> String {
    format!("요청: {}", user_request)
}

/// First 150 chars of the policy context plus the fixed core-rules phrase.
pub fn policy_summary(context_text: &str) -> String {
    let head: String = context_text.chars().take(150).collect();
    if head.is_empty() {
        CORE_RULES.to_string()
    } else {
        format!("{} {}", head.trim(), CORE_RULES)
    }
}

/// System prompt for template generation. Prior-iteration feedback and
/// few-shot examples are appended when present.
pub fn generation_system(analysis: &Analysis, policy_summary: &str, examples: &[ApprovedTemplate]) -> String {
    let mut prompt = format!(
        "알림톡 템플릿 생성 ({}-{}):\n\n요청: {}\n\n규칙: {}\n정책: {}\n",
        analysis.business_type.korean(),
        analysis.service_type.korean(),
        analysis.message_purpose,
        CORE_RULES,
        policy_summary,
    );

    if !examples.is_empty() {
        prompt.push_str("\n참고 템플릿:\n");
        for (i, example) in examples.iter().take(2).enumerate() {
            let head: String = example.text.chars().take(100).collect();
            prompt.push_str(&format!("{}. {}...\n", i + 1, head));
        }
    }

    if let Some(feedback) = &analysis.compliance_feedback {
        prompt.push_str("\n이전 검사에서 발견된 문제를 반드시 수정:\n");
        for violation in &feedback.violations {
            prompt.push_str(&format!("- 위반: {}\n", violation));
        }
        for recommendation in &feedback.recommendations {
            prompt.push_str(&format!("- 개선: {}\n", recommendation));
        }
    }

    prompt.push_str(
        r#"
JSON으로만 응답:
{
  "template_text": "템플릿 내용",
  "variables": ["변수1", "변수2"],
  "button_suggestion": "버튼명"
}"#,
    );

    prompt
}

pub fn generation_user(analysis: &Analysis) -> String {
    format!(
        "대상: {}\n톤: {}\n변수: {}",
        analysis.target_audience,
        analysis.tone.korean(),
        analysis.required_variables.join(", "),
    )
}

/// System prompt for the advisory compliance review.
pub fn review_system(template_text: &str) -> String {
    format!(
        r#"알림톡 템플릿 정책 검사:

{}

확인: 길이 1000자 이하, #{{변수}} 형식, 광고성 표현 없음, 정보성 메시지 표시

JSON으로만 응답:
{{
  "is_compliant": true,
  "compliance_score": 0,
  "violations": ["문제점"],
  "recommendations": ["개선안"]
}}"#,
        template_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ApprovalStatus, ApprovedTemplateMetadata, BusinessType, ComplianceFeedback, ServiceType,
    };

    #[test]
    fn test_analysis_prompt_lists_enum_values() {
        let prompt = analysis_system();
        assert!(prompt.contains("education|medical"));
        assert!(prompt.contains("formal|friendly|official"));
        assert!(prompt.contains("required_variables"));
    }

    #[test]
    fn test_policy_summary_truncates_to_150_chars() {
        let long = "정".repeat(400);
        let summary = policy_summary(&long);
        assert!(summary.starts_with(&"정".repeat(150)));
        assert!(summary.contains("핵심: 1000자 이내"));
    }

    #[test]
    fn test_policy_summary_empty_context() {
        let summary = policy_summary("");
        assert_eq!(summary, CORE_RULES);
    }

    #[test]
    fn test_generation_prompt_without_feedback() {
        let analysis = Analysis {
            business_type: BusinessType::Education,
            service_type: ServiceType::Application,
            message_purpose: "수강 신청 완료 안내".to_string(),
            ..Analysis::default()
        };
        let prompt = generation_system(&analysis, "정책 요약", &[]);

        assert!(prompt.contains("교육-신청"));
        assert!(prompt.contains("수강 신청 완료 안내"));
        assert!(prompt.contains("template_text"));
        assert!(!prompt.contains("이전 검사"));
    }

    #[test]
    fn test_generation_prompt_appends_feedback() {
        let analysis = Analysis {
            compliance_feedback: Some(ComplianceFeedback {
                violations: vec!["광고성 키워드 발견: 할인".to_string()],
                recommendations: vec!["광고성 표현을 제거하세요".to_string()],
                required_changes: vec![],
            }),
            ..Analysis::default()
        };
        let prompt = generation_system(&analysis, "요약", &[]);

        assert!(prompt.contains("이전 검사에서 발견된 문제"));
        assert!(prompt.contains("위반: 광고성 키워드 발견: 할인"));
        assert!(prompt.contains("개선: 광고성 표현을 제거하세요"));
    }

    #[test]
    fn test_generation_prompt_includes_at_most_two_examples() {
        let example = |id: &str| ApprovedTemplate {
            id: id.to_string(),
            text: "안녕하세요 #{수신자명}님, 예약이 확정되었습니다.".to_string(),
            variables: vec!["수신자명".to_string()],
            metadata: ApprovedTemplateMetadata {
                business_type: BusinessType::Medical,
                service_type: ServiceType::Reservation,
                category_1: "서비스이용".to_string(),
                category_2: "예약/신청".to_string(),
                approval_status: ApprovalStatus::Approved,
            },
        };
        let examples = vec![example("a"), example("b"), example("c")];
        let prompt = generation_system(&Analysis::default(), "요약", &examples);

        assert!(prompt.contains("참고 템플릿"));
        assert!(prompt.contains("1. "));
        assert!(prompt.contains("2. "));
        assert!(!prompt.contains("3. "));
    }

    #[test]
    fn test_generation_user_carries_tone_and_variables() {
        let analysis = Analysis {
            required_variables: vec!["수신자명".to_string(), "일정".to_string()],
            ..Analysis::default()
        };
        let user = generation_user(&analysis);
        assert!(user.contains("정중한"));
        assert!(user.contains("수신자명, 일정"));
    }

    #[test]
    fn test_review_prompt_embeds_template() {
        let prompt = review_system("안녕하세요 #{수신자명}님");
        assert!(prompt.contains("안녕하세요 #{수신자명}님"));
        assert!(prompt.contains("compliance_score"));
    }
}
