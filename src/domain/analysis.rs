//! Request analysis result and the business/service taxonomy.
//!
//! The taxonomies are closed enums. The LLM may emit out-of-enum strings or
//! Korean labels; `parse_or_default` re-anchors both to a valid member.

use serde::{Deserialize, Serialize};

/// Business vertical of the requesting sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Education,
    Medical,
    Restaurant,
    Ecommerce,
    Service,
    Finance,
    Other,
}

impl BusinessType {
    /// Korean label used in queries, prompts and reports.
    pub fn korean(&self) -> &'static str {
        match self {
            BusinessType::Education => "교육",
            BusinessType::Medical => "의료",
            BusinessType::Restaurant => "음식점",
            BusinessType::Ecommerce => "쇼핑몰",
            BusinessType::Service => "서비스업",
            BusinessType::Finance => "금융",
            BusinessType::Other => "기타",
        }
    }

    /// Accepts snake_case members and Korean labels; everything else maps to `Other`.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "education" | "교육" => BusinessType::Education,
            "medical" | "의료" => BusinessType::Medical,
            "restaurant" | "음식점" => BusinessType::Restaurant,
            "ecommerce" | "쇼핑몰" => BusinessType::Ecommerce,
            "service" | "서비스업" => BusinessType::Service,
            "finance" | "금융" => BusinessType::Finance,
            _ => BusinessType::Other,
        }
    }

    pub const ALL: [BusinessType; 7] = [
        BusinessType::Education,
        BusinessType::Medical,
        BusinessType::Restaurant,
        BusinessType::Ecommerce,
        BusinessType::Service,
        BusinessType::Finance,
        BusinessType::Other,
    ];
}

impl Default for BusinessType {
    fn default() -> Self {
        BusinessType::Other
    }
}

/// Kind of service event the message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Application,
    Reservation,
    Order,
    Delivery,
    Notification,
    Confirmation,
    Feedback,
}

impl ServiceType {
    pub fn korean(&self) -> &'static str {
        match self {
            ServiceType::Application => "신청",
            ServiceType::Reservation => "예약",
            ServiceType::Order => "주문",
            ServiceType::Delivery => "배송",
            ServiceType::Notification => "안내",
            ServiceType::Confirmation => "확인",
            ServiceType::Feedback => "피드백",
        }
    }

    /// Accepts snake_case members and Korean labels; everything else maps to `Notification`.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "application" | "신청" => ServiceType::Application,
            "reservation" | "예약" => ServiceType::Reservation,
            "order" | "주문" => ServiceType::Order,
            "delivery" | "배송" => ServiceType::Delivery,
            "confirmation" | "확인" => ServiceType::Confirmation,
            "feedback" | "피드백" => ServiceType::Feedback,
            _ => ServiceType::Notification,
        }
    }

    pub const ALL: [ServiceType; 7] = [
        ServiceType::Application,
        ServiceType::Reservation,
        ServiceType::Order,
        ServiceType::Delivery,
        ServiceType::Notification,
        ServiceType::Confirmation,
        ServiceType::Feedback,
    ];
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Notification
    }
}

/// Tone of voice for the generated template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Friendly,
    Official,
}

impl Tone {
    pub fn korean(&self) -> &'static str {
        match self {
            Tone::Formal => "정중한",
            Tone::Friendly => "친근한",
            Tone::Official => "공식적인",
        }
    }

    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "friendly" | "친근한" => Tone::Friendly,
            "official" | "공식적인" => Tone::Official,
            _ => Tone::Formal,
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone::Formal
    }
}

/// Urgency derived from the request wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "high" | "높음" => Urgency::High,
            "low" | "낮음" => Urgency::Low,
            _ => Urgency::Medium,
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

/// KakaoTalk template category pair (category_1 > category_2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedCategory {
    pub category_1: String,
    pub category_2: String,
}

impl Default for EstimatedCategory {
    fn default() -> Self {
        Self {
            category_1: categories::SERVICE_USAGE.to_string(),
            category_2: categories::USAGE_NOTICE.to_string(),
        }
    }
}

impl EstimatedCategory {
    fn new(category_1: &str, category_2: &str) -> Self {
        Self {
            category_1: category_1.to_string(),
            category_2: category_2.to_string(),
        }
    }

    /// Fixed (business_type, service_type) → category mapping, with the
    /// service-usage notice pair as the fallback.
    pub fn for_types(business_type: BusinessType, service_type: ServiceType) -> Self {
        use categories::*;
        match (business_type, service_type) {
            (BusinessType::Education, ServiceType::Application)
            | (BusinessType::Education, ServiceType::Notification)
            | (BusinessType::Finance, ServiceType::Notification) => Self::new(SERVICE_USAGE, USAGE_NOTICE),
            (BusinessType::Ecommerce, ServiceType::Order)
            | (BusinessType::Ecommerce, ServiceType::Confirmation)
            | (BusinessType::Restaurant, ServiceType::Order) => Self::new(TRANSACTION, ORDER_PAYMENT),
            (BusinessType::Ecommerce, ServiceType::Delivery) => Self::new(DELIVERY, DELIVERY_NOTICE),
            (BusinessType::Medical, ServiceType::Reservation)
            | (BusinessType::Service, ServiceType::Reservation)
            | (BusinessType::Restaurant, ServiceType::Reservation) => Self::new(SERVICE_USAGE, RESERVATION_APPLICATION),
            (_, ServiceType::Feedback) => Self::new(SERVICE_USAGE, FEEDBACK_REQUEST),
            _ => Self::default(),
        }
    }
}

/// Category taxonomy constants and option lists (ListCategories).
pub mod categories {
    pub const SERVICE_USAGE: &str = "서비스이용";
    pub const TRANSACTION: &str = "거래";
    pub const DELIVERY: &str = "배송";
    pub const MEMBERSHIP: &str = "회원관리";
    pub const SUPPORT: &str = "고객지원";

    pub const USAGE_NOTICE: &str = "이용안내/공지";
    pub const RESERVATION_APPLICATION: &str = "예약/신청";
    pub const FEEDBACK_REQUEST: &str = "피드백 요청";
    pub const ORDER_PAYMENT: &str = "주문/결제";
    pub const CANCEL_REFUND: &str = "취소/환불";
    pub const DELIVERY_NOTICE: &str = "배송안내";
    pub const DELIVERY_COMPLETE: &str = "배송완료";

    pub const CATEGORY_1_OPTIONS: [&str; 5] =
        [SERVICE_USAGE, TRANSACTION, DELIVERY, MEMBERSHIP, SUPPORT];

    pub const CATEGORY_2_OPTIONS: [&str; 7] = [
        USAGE_NOTICE,
        RESERVATION_APPLICATION,
        FEEDBACK_REQUEST,
        ORDER_PAYMENT,
        CANCEL_REFUND,
        DELIVERY_NOTICE,
        DELIVERY_COMPLETE,
    ];
}

/// Verdict feedback carried into the next generation iteration, by value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceFeedback {
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
    pub required_changes: Vec<String>,
}

/// Structured output of request analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub business_type: BusinessType,
    pub service_type: ServiceType,
    pub message_purpose: String,
    pub target_audience: String,
    pub tone: Tone,
    pub urgency: Urgency,
    /// Display names for `#{...}` placeholders, deduplicated, order-preserving
    pub required_variables: Vec<String>,
    pub estimated_category: EstimatedCategory,
    pub compliance_concerns: Vec<String>,
    /// Set by the workflow between refinement iterations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_feedback: Option<ComplianceFeedback>,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            business_type: BusinessType::Other,
            service_type: ServiceType::Notification,
            message_purpose: "일반 안내".to_string(),
            target_audience: "고객".to_string(),
            tone: Tone::Formal,
            urgency: Urgency::Medium,
            required_variables: vec!["수신자명".to_string()],
            estimated_category: EstimatedCategory::default(),
            compliance_concerns: Vec::new(),
            compliance_feedback: None,
        }
    }
}

impl Analysis {
    /// Fallback analysis used when the model call fails outright.
    pub fn fallback() -> Self {
        Self {
            compliance_concerns: vec!["분석 실패로 수동 검토가 필요합니다".to_string()],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_type_parse_english_and_korean() {
        assert_eq!(BusinessType::parse_or_default("education"), BusinessType::Education);
        assert_eq!(BusinessType::parse_or_default("교육"), BusinessType::Education);
        assert_eq!(BusinessType::parse_or_default("의료"), BusinessType::Medical);
        assert_eq!(BusinessType::parse_or_default("unknown vertical"), BusinessType::Other);
    }

    #[test]
    fn test_service_type_parse_defaults_to_notification() {
        assert_eq!(ServiceType::parse_or_default("예약"), ServiceType::Reservation);
        assert_eq!(ServiceType::parse_or_default("delivery"), ServiceType::Delivery);
        assert_eq!(ServiceType::parse_or_default("???"), ServiceType::Notification);
    }

    #[test]
    fn test_enum_serde_snake_case() {
        let json = serde_json::to_string(&BusinessType::Ecommerce).unwrap();
        assert_eq!(json, "\"ecommerce\"");
        let parsed: ServiceType = serde_json::from_str("\"application\"").unwrap();
        assert_eq!(parsed, ServiceType::Application);
    }

    #[test]
    fn test_category_lookup_known_pairs() {
        let cat = EstimatedCategory::for_types(BusinessType::Education, ServiceType::Application);
        assert_eq!(cat.category_1, "서비스이용");
        assert_eq!(cat.category_2, "이용안내/공지");

        let cat = EstimatedCategory::for_types(BusinessType::Ecommerce, ServiceType::Order);
        assert_eq!(cat.category_1, "거래");
        assert_eq!(cat.category_2, "주문/결제");

        let cat = EstimatedCategory::for_types(BusinessType::Medical, ServiceType::Reservation);
        assert_eq!(cat.category_2, "예약/신청");
    }

    #[test]
    fn test_category_lookup_fallback() {
        let cat = EstimatedCategory::for_types(BusinessType::Finance, ServiceType::Order);
        assert_eq!(cat, EstimatedCategory::default());
    }

    #[test]
    fn test_fallback_analysis_flags_manual_review() {
        let analysis = Analysis::fallback();
        assert_eq!(analysis.business_type, BusinessType::Other);
        assert_eq!(analysis.service_type, ServiceType::Notification);
        assert_eq!(analysis.required_variables, vec!["수신자명".to_string()]);
        assert!(analysis.compliance_concerns[0].contains("분석 실패"));
    }

    #[test]
    fn test_analysis_roundtrip_with_feedback() {
        let mut analysis = Analysis::default();
        analysis.compliance_feedback = Some(ComplianceFeedback {
            violations: vec!["광고성 키워드 발견: 할인".to_string()],
            recommendations: vec!["광고성 표현을 제거하세요".to_string()],
            required_changes: vec![],
        });

        let json = serde_json::to_string(&analysis).unwrap();
        let back: Analysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.compliance_feedback.unwrap().violations.len(), 1);
    }

    #[test]
    fn test_analysis_tolerates_missing_fields() {
        let analysis: Analysis = serde_json::from_str("{\"business_type\":\"medical\"}").unwrap();
        assert_eq!(analysis.business_type, BusinessType::Medical);
        assert_eq!(analysis.tone, Tone::Formal);
    }
}
