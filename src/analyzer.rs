//! Request analyzer: LLM classification hardened by deterministic keyword
//! rules.
//!
//! Short Korean requests make the model drift on the closed taxonomies, so a
//! fixed keyword table re-anchors business/service types after every call.
//! Results are cached by request text.

use std::sync::Arc;

use crate::cache::{ResultCache, NS_REQUEST_ANALYSIS};
use crate::domain::{Analysis, BusinessType, EstimatedCategory, ServiceType, TemplateRequest, Urgency};
use crate::llm::LlmOps;

/// First keyword hit wins, so more specific verticals come first.
const BUSINESS_KEYWORDS: [(BusinessType, &[&str]); 6] = [
    (BusinessType::Education, &["강의", "수강", "교육", "학습", "코스", "강좌", "학원"]),
    (BusinessType::Medical, &["병원", "진료", "치과", "치료", "의료", "건강", "내원"]),
    (BusinessType::Restaurant, &["음식", "식당", "메뉴", "매장"]),
    (BusinessType::Ecommerce, &["구매", "주문", "배송", "상품", "결제", "쇼핑"]),
    (BusinessType::Finance, &["송금", "계좌", "카드", "대출", "보험", "금융"]),
    (BusinessType::Service, &["상담", "서비스", "이용"]),
];

const SERVICE_KEYWORDS: [(ServiceType, &[&str]); 7] = [
    (ServiceType::Application, &["신청", "등록", "가입", "접수"]),
    (ServiceType::Reservation, &["예약", "예정"]),
    (ServiceType::Order, &["주문", "구매", "결제"]),
    (ServiceType::Delivery, &["배송", "발송", "택배", "출고"]),
    (ServiceType::Confirmation, &["확인", "승인", "완료"]),
    (ServiceType::Feedback, &["후기", "평가", "리뷰", "만족도"]),
    (ServiceType::Notification, &["안내", "공지", "알림"]),
];

/// Variable display names keyed by trigger words in the request.
const VARIABLE_PATTERNS: [(&str, &[&str]); 7] = [
    ("예약일시", &["예약"]),
    ("일정", &["일정", "날짜", "시간"]),
    ("금액", &["금액", "가격", "비용", "요금"]),
    ("상품명", &["상품", "제품"]),
    ("주소", &["주소", "위치", "장소"]),
    ("연락처", &["전화", "연락처"]),
    ("인증번호", &["코드", "인증"]),
];

const URGENCY_HIGH: [&str; 3] = ["긴급", "즉시", "빠른"];
const URGENCY_LOW: [&str; 2] = ["일반", "정기"];

const AD_CONCERN_KEYWORDS: [&str; 5] = ["할인", "이벤트", "프로모션", "혜택", "특가"];
const PROHIBITED_CONCERN_KEYWORDS: [&str; 4] = ["무료", "쿠폰", "포인트", "적립"];

pub struct RequestAnalyzer {
    ops: Arc<LlmOps>,
    cache: Arc<ResultCache>,
}

impl RequestAnalyzer {
    pub fn new(ops: Arc<LlmOps>, cache: Arc<ResultCache>) -> Self {
        Self { ops, cache }
    }

    /// Analyze a request. Model failures are absorbed into the default
    /// analysis; the error annotation is returned for workflow bookkeeping.
    pub async fn analyze(&self, request: &TemplateRequest) -> (Analysis, Option<String>) {
        let cache_keys = serde_json::json!({ "request": request.user_request });
        if let Some(cached) = self.cache.get(NS_REQUEST_ANALYSIS, &cache_keys) {
            if let Ok(analysis) = serde_json::from_value::<Analysis>(cached) {
                log::debug!("analysis served from cache");
                return (analysis, None);
            }
        }

        let (mut analysis, error) = match self.ops.analyze(&request.user_request).await {
            Ok(analysis) => (analysis, None),
            Err(e) => {
                log::warn!("request analysis fell back to defaults: {}", e);
                (Analysis::fallback(), Some(format!("{}: {}", e.code(), e)))
            }
        };

        enhance(&mut analysis, &request.user_request);
        apply_hints(&mut analysis, request);

        if let Ok(value) = serde_json::to_value(&analysis) {
            self.cache.set(NS_REQUEST_ANALYSIS, value, &cache_keys);
        }

        (analysis, error)
    }
}

/// Deterministic enhancement over the raw model output.
fn enhance(analysis: &mut Analysis, user_request: &str) {
    if let Some(business_type) = classify_business(user_request) {
        analysis.business_type = business_type;
    }
    if let Some(service_type) = classify_service(user_request) {
        analysis.service_type = service_type;
    }

    analysis.required_variables = extract_variables(user_request, &analysis.required_variables);
    analysis.urgency = derive_urgency(user_request, analysis.urgency);
    analysis.estimated_category = EstimatedCategory::for_types(analysis.business_type, analysis.service_type);

    for concern in scan_concerns(user_request) {
        if !analysis.compliance_concerns.contains(&concern) {
            analysis.compliance_concerns.push(concern);
        }
    }
}

/// Caller-supplied hints take precedence over everything else.
fn apply_hints(analysis: &mut Analysis, request: &TemplateRequest) {
    if let Some(business_type) = request.business_type {
        analysis.business_type = business_type;
    }
    if let Some(service_type) = request.service_type {
        analysis.service_type = service_type;
    }
    if let Some(tone) = request.tone {
        analysis.tone = tone;
    }
    for variable in &request.required_variables {
        if !analysis.required_variables.contains(variable) {
            analysis.required_variables.push(variable.clone());
        }
    }
    if request.business_type.is_some() || request.service_type.is_some() {
        analysis.estimated_category =
            EstimatedCategory::for_types(analysis.business_type, analysis.service_type);
    }
}

/// Keyword approximation of the business type, also used by the workflow's
/// overlapped retrieval path before the full analysis lands.
pub(crate) fn classify_business(text: &str) -> Option<BusinessType> {
    BUSINESS_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(business_type, _)| *business_type)
}

pub(crate) fn classify_service(text: &str) -> Option<ServiceType> {
    SERVICE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(service_type, _)| *service_type)
}

/// Recipient name always leads; pattern-matched names follow, then whatever
/// the model suggested, deduplicated in order.
fn extract_variables(text: &str, model_suggested: &[String]) -> Vec<String> {
    let mut variables = vec!["수신자명".to_string()];

    for (name, keywords) in VARIABLE_PATTERNS {
        if keywords.iter().any(|k| text.contains(k)) {
            let name = name.to_string();
            if !variables.contains(&name) {
                variables.push(name);
            }
        }
    }

    for name in model_suggested {
        if !variables.contains(name) {
            variables.push(name.clone());
        }
    }

    variables
}

fn derive_urgency(text: &str, from_model: Urgency) -> Urgency {
    if URGENCY_HIGH.iter().any(|k| text.contains(k)) {
        Urgency::High
    } else if URGENCY_LOW.iter().any(|k| text.contains(k)) {
        Urgency::Low
    } else {
        from_model
    }
}

fn scan_concerns(text: &str) -> Vec<String> {
    let mut concerns = Vec::new();
    if AD_CONCERN_KEYWORDS.iter().any(|k| text.contains(k)) {
        concerns.push("광고성 내용 포함 가능성".to_string());
    }
    if PROHIBITED_CONCERN_KEYWORDS.iter().any(|k| text.contains(k)) {
        concerns.push("금지 키워드 포함 가능성".to_string());
    }
    concerns
}
