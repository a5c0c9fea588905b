//! Deterministic rule checks: basic rules, blacklist patterns, variable usage.
//!
//! Each sub-check starts at 100 and deducts per violation. All tables live
//! behind `LazyLock` so patterns compile once and stay tunable in one place.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::template::{extract_variables, strip_variables, MAX_TEMPLATE_CHARS, MAX_VARIABLES};
use crate::generator::{GREETINGS, INFO_NOTICE_TOKENS};

/// Advertising keywords are a basic-rules concern, separate from the
/// blacklist category patterns.
pub const AD_KEYWORDS: [&str; 11] = [
    "할인", "특가", "이벤트", "프로모션", "혜택", "무료", "선착순", "한정", "특별", "기회", "놓치지",
];

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\d{2,3}-\d{3,4}-\d{4}", r"\d{10,11}", r"1\d{3}-\d{4}"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Blacklist categories and their patterns. The category names are the
/// contract; the regexes themselves are tuning data.
static BLACKLIST: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    [
        ("무료 서비스", vec![r"무료.*뉴스레터", r"무료.*구독", r"무료.*멤버십"]),
        ("포인트 적립", vec![r"포인트.*적립", r"적립금.*지급", r"마일리지.*적립"]),
        ("쿠폰 발급", vec![r"쿠폰.*발급", r"한정.*쿠폰", r"쿠폰.*소멸"]),
        ("광고성 내용", vec![r"할인.*이벤트", r"특가.*행사", r"프로모션.*혜택"]),
        ("스팸 패턴", vec![r"지금.*클릭", r"놓치지.*마세요", r"단\s*\d+일"]),
    ]
    .into_iter()
    .map(|(name, patterns)| {
        (name, patterns.into_iter().map(|p| Regex::new(p).unwrap()).collect())
    })
    .collect()
});

static VALID_VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[가-힣a-zA-Z0-9_ ]{1,20}$").unwrap());

/// Result of one deterministic sub-check.
#[derive(Debug, Clone)]
pub struct SubCheck {
    pub score: f64,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl SubCheck {
    fn new() -> Self {
        Self {
            score: 100.0,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn violate(&mut self, deduction: f64, message: String) {
        self.score = (self.score - deduction).max(0.0);
        self.violations.push(message);
    }

    fn warn(&mut self, deduction: f64, message: String) {
        self.score = (self.score - deduction).max(0.0);
        self.warnings.push(message);
    }
}

/// Length, greeting, information notice, advertising keywords, contact info.
pub fn check_basic(text: &str) -> SubCheck {
    let mut check = SubCheck::new();

    let char_count = text.chars().count();
    if char_count > MAX_TEMPLATE_CHARS {
        check.violate(20.0, format!("메시지 길이 초과 ({}/{}자)", char_count, MAX_TEMPLATE_CHARS));
    }

    if !GREETINGS.iter().any(|g| text.contains(g)) {
        check.warn(5.0, "인사말이 포함되지 않았습니다".to_string());
    }

    if !INFO_NOTICE_TOKENS.iter().any(|t| text.contains(t)) {
        check.violate(15.0, "정보성 메시지 표시가 없습니다".to_string());
    }

    let found: Vec<&str> = AD_KEYWORDS.iter().filter(|k| text.contains(*k)).copied().collect();
    if !found.is_empty() {
        check.violate(25.0, format!("광고성 키워드 발견: {}", found.join(", ")));
    }

    let phone_count: usize = PHONE_PATTERNS.iter().map(|p| p.find_iter(text).count()).sum();
    if phone_count > 2 {
        check.violate(10.0, "과도한 연락처 정보 포함".to_string());
    }

    check
}

/// One deduction per matched blacklist category.
pub fn check_blacklist(text: &str) -> SubCheck {
    let mut check = SubCheck::new();

    for (category, patterns) in BLACKLIST.iter() {
        if patterns.iter().any(|p| p.is_match(text)) {
            check.violate(30.0, format!("블랙리스트 위반: {}", category));
        }
    }

    check
}

/// Variable count, variables-only content, name validity, button usage.
pub fn check_variables(text: &str, button_suggestion: Option<&str>) -> SubCheck {
    let mut check = SubCheck::new();
    let variables = extract_variables(text);

    if variables.len() > MAX_VARIABLES {
        check.violate(25.0, format!("변수 개수 초과 ({}/{}개)", variables.len(), MAX_VARIABLES));
    }

    let stripped = strip_variables(text);
    let residue: usize = stripped.chars().filter(|c| !c.is_whitespace()).count();
    if residue < 10 {
        check.violate(30.0, "변수만으로 구성된 템플릿입니다".to_string());
    }

    let invalid: Vec<String> = variables
        .iter()
        .filter(|name| !VALID_VARIABLE_NAME.is_match(name))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        check.violate(10.0, format!("잘못된 변수명: {}", invalid.join(", ")));
    }

    if button_suggestion.is_some_and(|b| b.contains("#{")) {
        check.violate(15.0, "버튼명에 변수 사용 금지".to_string());
    }

    check
}
