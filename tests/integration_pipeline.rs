//! End-to-end pipeline integration tests
//!
//! Drives the full service (analyzer → retrieval → generator → compliance →
//! workflow) over a scripted chat client and an in-memory vector store.

use std::sync::Arc;

use async_trait::async_trait;

use alimgen::config::Config;
use alimgen::domain::{
    ApprovalStatus, ApprovedTemplate, ApprovedTemplateMetadata, BusinessType, PolicyChunk,
    PolicyType, ServiceType, TemplateRequest,
};
use alimgen::error::Result;
use alimgen::llm::ScriptedChatClient;
use alimgen::search::vector::EmbeddingClient;
use alimgen::search::InMemoryVectorStore;
use alimgen::service::TemplateService;

/// Deterministic embedder over a fixed Korean vocabulary.
struct VocabEmbedder;

const VOCAB: [&str; 8] = ["교육", "강의", "신청", "예약", "진료", "배송", "정책", "알림톡"];

#[async_trait]
impl EmbeddingClient for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(VOCAB.iter().map(|w| text.matches(w).count() as f32).collect())
    }
}

fn chunk(source: &str, policy_type: PolicyType, index: usize, content: &str) -> PolicyChunk {
    PolicyChunk {
        content: content.to_string(),
        source: source.to_string(),
        policy_type,
        chunk_index: index,
        relevance_score: 0.0,
    }
}

fn policy_corpus() -> Vec<PolicyChunk> {
    vec![
        chunk(
            "content-guide.md",
            PolicyType::ContentGuidelines,
            0,
            "알림톡 템플릿 작성 정책: 정보성 메시지만 허용되며 1000자 이내로 작성합니다.",
        ),
        chunk(
            "audit.md",
            PolicyType::ReviewGuidelines,
            0,
            "알림톡 심사 기준: 광고성 표현과 블랙리스트 유형은 반려 사유입니다.",
        ),
        chunk(
            "content-guide.md",
            PolicyType::ContentGuidelines,
            1,
            "변수 사용 규칙: 변수는 #{변수명} 형식으로 40개 이하로 사용합니다.",
        ),
    ]
}

fn approved_templates() -> Vec<ApprovedTemplate> {
    vec![ApprovedTemplate {
        id: "edu_001".to_string(),
        text: "안녕하세요 #{수신자명}님, 강의 신청이 접수되었습니다.".to_string(),
        variables: vec!["수신자명".to_string()],
        metadata: ApprovedTemplateMetadata {
            business_type: BusinessType::Education,
            service_type: ServiceType::Application,
            category_1: "서비스이용".to_string(),
            category_2: "이용안내/공지".to_string(),
            approval_status: ApprovalStatus::Approved,
        },
    }]
}

async fn service_with(responses: Vec<&str>) -> (TemplateService, Arc<ScriptedChatClient>) {
    let chat = Arc::new(ScriptedChatClient::new(
        responses.into_iter().map(String::from).collect(),
    ));
    let service = TemplateService::new(
        &Config::default(),
        chat.clone(),
        Arc::new(VocabEmbedder),
        Arc::new(InMemoryVectorStore::new()),
        policy_corpus(),
        approved_templates(),
    )
    .await
    .expect("service construction");
    (service, chat)
}

const GOOD_REVIEW: &str =
    r#"{"is_compliant": true, "compliance_score": 90, "violations": [], "recommendations": []}"#;
const BAD_REVIEW: &str =
    r#"{"is_compliant": false, "compliance_score": 30, "violations": ["광고성 표현"], "recommendations": []}"#;

/// S1: education application request generates a compliant template in one
/// iteration.
#[tokio::test]
async fn test_education_application_request() {
    let (service, _) = service_with(vec![
        r#"{"business_type": "education", "service_type": "application", "message_purpose": "수강 신청 완료 안내"}"#,
        r#"{"template_text": "안녕하세요 #{수신자명}님, 파이썬 강의 수강 신청이 완료되었습니다.", "variables": ["수신자명"], "button_suggestion": "강의 보기"}"#,
        GOOD_REVIEW,
    ])
    .await;

    let request = TemplateRequest::new("온라인 파이썬 강의 수강 신청 완료 안내");
    let result = service.generate(&request).await.unwrap();

    assert!(result.success);
    assert_eq!(result.analysis.business_type, BusinessType::Education);
    assert_eq!(result.analysis.service_type, ServiceType::Application);
    assert!(result.template.text.contains("안녕하세요"));
    assert!(result.template.text.contains("#{수신자명}"));
    assert!(result.template.text.contains("정보성"));
    assert!(result.compliance.compliance_score >= 80.0);
    assert_eq!(result.workflow_info.iterations, 1);
    assert!(!result.workflow_info.policy_sources.is_empty());
}

/// S2: promotional text trips the blacklist and advertising checks.
#[tokio::test]
async fn test_promotional_text_rejected() {
    let (service, _) = service_with(vec![BAD_REVIEW]).await;

    let report = service
        .validate_template("50% 할인 이벤트 진행 중! 특가 상품을 확인하세요", None, None, None)
        .await;

    let compliance = &report.compliance;
    assert!(!compliance.is_compliant);
    assert!(compliance.detailed_scores.blacklist_check < 100.0);
    assert_eq!(
        compliance.approval_probability,
        alimgen::domain::ApprovalProbability::Low
    );
    let ad_violation = compliance
        .violations
        .iter()
        .find(|v| v.contains("광고성 키워드 발견"))
        .expect("advertising violation");
    assert!(ad_violation.contains("할인"));
    assert!(ad_violation.contains("이벤트"));
    assert!(ad_violation.contains("특가"));
    assert!(report.report.contains("위반사항"));
}

/// S3: medical reservation request carries the reservation variables.
#[tokio::test]
async fn test_medical_reservation_request() {
    let (service, _) = service_with(vec![
        r#"{"business_type": "medical", "service_type": "reservation", "message_purpose": "진료 예약 확정 안내"}"#,
        r#"{"template_text": "안녕하세요 #{수신자명}님, #{예약일시} 진료 예약이 확정되었습니다. 내원 시 신분증을 지참해 주세요.", "variables": ["수신자명", "예약일시"]}"#,
        GOOD_REVIEW,
    ])
    .await;

    let request = TemplateRequest::new("치과 진료 예약 확정 및 내원 준비사항 안내");
    let result = service.generate(&request).await.unwrap();

    assert_eq!(result.analysis.business_type, BusinessType::Medical);
    assert_eq!(result.analysis.service_type, ServiceType::Reservation);
    assert!(result.template.variables.contains(&"수신자명".to_string()));
    assert!(result.template.variables.contains(&"예약일시".to_string()));
    assert!(result.compliance.is_compliant);
}

/// S4: caller text without an information notice gets flagged; variables are
/// extracted from the text.
#[tokio::test]
async fn test_validate_template_missing_notice() {
    let (service, _) = service_with(vec![GOOD_REVIEW]).await;

    let text = "안녕하세요 #{수신자명}님, 강의 신청이 완료되었습니다. 일정: #{일정}";
    let report = service.validate_template(text, None, None, None).await;

    let compliance = &report.compliance;
    assert!(compliance.violations.iter().any(|v| v.contains("정보성 메시지")));
    assert!(!compliance.violations.iter().any(|v| v.contains("길이 초과")));
    // Variables in first-occurrence order, extracted from the text
    let validated = service.validate_template(text, None, None, None).await;
    assert_eq!(validated.compliance.detailed_scores.variable_usage, 100.0);
    assert!(report.report.contains("정보성 메시지"));
}

/// S5: 41 distinct placeholders exceed the variable cap and force changes.
#[tokio::test]
async fn test_validate_template_variable_overflow() {
    let (service, _) = service_with(vec![GOOD_REVIEW]).await;

    let placeholders: String = (0..41).map(|i| format!("#{{변수{}}} ", i)).collect();
    let text = format!(
        "안녕하세요 고객님, 아래 정보를 확인해 주세요. ※ 이 메시지는 정보성 안내입니다. {}",
        placeholders
    );
    let report = service.validate_template(&text, None, None, None).await;

    let compliance = &report.compliance;
    assert!(!compliance.is_compliant);
    assert!(compliance.violations.iter().any(|v| v.contains("변수 개수 초과 (41/40개)")));
    assert!(compliance
        .required_changes
        .iter()
        .any(|c| c.contains("변수 개수 초과")));
}

/// S6: a byte-identical second request is served from the cache for both the
/// analysis and the template.
#[tokio::test]
async fn test_repeat_request_hits_cache() {
    let (service, chat) = service_with(vec![
        r#"{"business_type": "education", "service_type": "application"}"#,
        r#"{"template_text": "안녕하세요 #{수신자명}님, 수강 신청이 완료되었습니다.", "variables": ["수신자명"]}"#,
        GOOD_REVIEW,
        GOOD_REVIEW,
    ])
    .await;

    let request = TemplateRequest::new("강의 수강 신청 완료 안내");
    let first = service.generate(&request).await.unwrap();
    let second = service.generate(&request).await.unwrap();

    // Analysis and generation were each called once; only the compliance
    // review ran twice
    assert_eq!(chat.call_count(), 4);
    assert_eq!(first.template.text, second.template.text);
    assert_eq!(
        serde_json::to_string(&first.analysis).unwrap(),
        serde_json::to_string(&second.analysis).unwrap()
    );

    let stats = service.stats();
    assert_eq!(stats.cache.hits, 2);
    assert_eq!(stats.total_requests, 2);
}

/// Generated templates respect the structural invariants regardless of what
/// the model returns.
#[tokio::test]
async fn test_template_invariants_hold() {
    let oversized_body = format!(
        "{{\"template_text\": \"{}. 안내 사항입니다.\", \"variables\": []}}",
        "가".repeat(1500)
    );
    let (service, _) = service_with(vec![
        r#"{"business_type": "service", "service_type": "notification"}"#,
        &oversized_body,
        GOOD_REVIEW,
    ])
    .await;

    let result = service.generate(&TemplateRequest::new("서비스 공지")).await.unwrap();

    let template = &result.template;
    assert!(template.char_count() <= 1000);
    assert!(template.variables.len() <= 40);
    for variable in &template.variables {
        assert!(template.text.contains(&format!("#{{{}}}", variable)));
    }
    assert!(result.workflow_info.iterations <= 3);
}

/// A draft just under the cap with neither marker still ends under the cap
/// after the greeting and information notice are inserted.
#[tokio::test]
async fn test_near_cap_draft_invariant_holds() {
    let near_cap_body = format!(
        "{{\"template_text\": \"{}. {}. 고객 확인 요청드립니다.\", \"variables\": []}}",
        "가".repeat(480),
        "나".repeat(480)
    );
    let (service, _) = service_with(vec![
        r#"{"business_type": "service", "service_type": "notification"}"#,
        &near_cap_body,
        GOOD_REVIEW,
    ])
    .await;

    let result = service.generate(&TemplateRequest::new("서비스 점검 공지")).await.unwrap();

    let template = &result.template;
    assert!(template.char_count() <= 1000);
    assert!(template.text.contains("안녕하세요"));
    assert!(template.text.contains("정보성"));
}

/// Empty and oversized requests are rejected at the boundary.
#[tokio::test]
async fn test_request_validation_at_boundary() {
    let (service, chat) = service_with(vec![]).await;

    let empty = TemplateRequest::new("   ");
    assert!(service.generate(&empty).await.is_err());

    let oversized = TemplateRequest::new("가".repeat(1001));
    assert!(service.generate(&oversized).await.is_err());

    // Neither request reached the model
    assert_eq!(chat.call_count(), 0);
}

#[tokio::test]
async fn test_secondary_operations() {
    let (service, _) = service_with(vec![]).await;

    let examples = service.search_examples(BusinessType::Education, 5);
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].id, "edu_001");
    assert!(service.search_examples(BusinessType::Finance, 5).is_empty());

    let categories = service.list_categories();
    assert!(categories.category_1_options.contains(&"서비스이용".to_string()));
    assert_eq!(categories.business_types.len(), 7);
    assert_eq!(categories.service_types.len(), 7);

    let health = service.health_check().await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.index_documents, 4);
    assert_eq!(health.template_count, 1);
    assert!(health.vector_documents > 0);
}

/// An empty corpus refuses to build the service.
#[tokio::test]
async fn test_empty_corpus_is_fatal() {
    let chat = Arc::new(ScriptedChatClient::new(vec![]));
    let result = TemplateService::new(
        &Config::default(),
        chat,
        Arc::new(VocabEmbedder),
        Arc::new(InMemoryVectorStore::new()),
        Vec::new(),
        Vec::new(),
    )
    .await;

    assert!(matches!(result, Err(alimgen::AlimgenError::IndexBuild(_))));
}
