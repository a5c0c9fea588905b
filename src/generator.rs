//! Template generator: LLM draft plus deterministic post-processing.
//!
//! Post-processing is the real guarantee here. Whatever the model returns,
//! the output leaves this module with normalized `#{...}` variables, a length
//! under the platform cap, a greeting, an information notice, and a variable
//! list re-extracted from the final text.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::cache::{ResultCache, NS_TEMPLATE_GENERATION};
use crate::domain::template::{extract_variables, MAX_TEMPLATE_CHARS};
use crate::domain::{Analysis, GenerationMethod, ServiceType, Template, TemplateMetadata, Tone};
use crate::llm::{prompts, GeneratedDraft, LlmOps};
use crate::rag::{PolicyContext, TemplateStore};

static DOLLAR_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());
static BRACE_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]+\}").unwrap());

pub const GREETINGS: [&str; 3] = ["안녕하세요", "안녕하십니까", "반갑습니다"];

/// Phrases that count as an information-notice marker. "정보성 안내" is
/// included so the fixed fallback template satisfies its own checker.
pub const INFO_NOTICE_TOKENS: [&str; 4] = ["정보성 메시지", "안내 메시지", "발송되는 메시지", "정보성 안내"];

/// Truncation target that leaves headroom under the hard cap for the
/// appended notice sentence.
const TRUNCATE_TARGET_CHARS: usize = 950;

/// A draft longer than `MAX_TEMPLATE_CHARS - INSERTION_HEADROOM_CHARS` must
/// be truncated up front: the greeting and notice insertions add up to 47
/// chars, and no length check runs after them.
const INSERTION_HEADROOM_CHARS: usize = 50;

pub struct TemplateGenerator {
    ops: Arc<LlmOps>,
    store: Arc<TemplateStore>,
    cache: Arc<ResultCache>,
}

impl TemplateGenerator {
    pub fn new(ops: Arc<LlmOps>, store: Arc<TemplateStore>, cache: Arc<ResultCache>) -> Self {
        Self { ops, store, cache }
    }

    /// Generate a template for an analysis and policy context. LLM failures
    /// are absorbed into the fixed fallback template; the error annotation is
    /// returned for workflow bookkeeping.
    pub async fn generate(&self, analysis: &Analysis, policy_context: &PolicyContext) -> (Template, Option<String>) {
        let policy_prefix: String = policy_context.context_text.chars().take(500).collect();
        let cache_keys = serde_json::json!({
            "analysis": serde_json::to_value(analysis).unwrap_or_default(),
            "policy_prefix": policy_prefix,
        });

        if let Some(cached) = self.cache.get(NS_TEMPLATE_GENERATION, &cache_keys) {
            if let Ok(template) = serde_json::from_value::<Template>(cached) {
                log::debug!("template served from cache");
                return (template, None);
            }
        }

        let examples = self.store.few_shot(analysis);
        let summary = prompts::policy_summary(&policy_context.context_text);

        let (template, error) = match self.ops.generate(analysis, &summary, &examples).await {
            Ok(draft) => (post_process(draft, analysis), None),
            Err(e) => {
                log::warn!("template generation fell back: {}", e);
                (fallback_template(analysis), Some(format!("{}: {}", e.code(), e)))
            }
        };

        if let Ok(value) = serde_json::to_value(&template) {
            self.cache.set(NS_TEMPLATE_GENERATION, value, &cache_keys);
        }

        (template, error)
    }
}

/// Deterministic post-processing, in order: variable syntax, length,
/// greeting, information notice, variable re-extraction.
fn post_process(draft: GeneratedDraft, analysis: &Analysis) -> Template {
    let mut text = normalize_variables(&draft.template_text);

    if text.chars().count() > MAX_TEMPLATE_CHARS - INSERTION_HEADROOM_CHARS {
        text = truncate_at_sentence(&text, TRUNCATE_TARGET_CHARS);
    }

    if !has_greeting(&text) {
        text = format!("{} {}", greeting_for(analysis.tone), text);
    }

    if !has_info_notice(&text) {
        text = format!("{}\n\n{}", text, info_notice_for(analysis.service_type));
    }

    let variables = extract_variables(&text);

    build_template(text, variables, draft.button_suggestion, analysis, GenerationMethod::AiGenerated)
}

/// Rewrite `${name}` and bare `{name}` placeholders to `#{name}`.
fn normalize_variables(text: &str) -> String {
    let text = DOLLAR_VAR.replace_all(text, "#{$1}");

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in BRACE_VAR.find_iter(&text) {
        out.push_str(&text[last..m.start()]);
        if !text[..m.start()].ends_with('#') {
            out.push('#');
        }
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Cut at the last sentence boundary that keeps the text under `target`
/// chars, guaranteeing a trailing period.
fn truncate_at_sentence(text: &str, target: usize) -> String {
    let mut truncated = String::new();

    for sentence in text.split('.') {
        let candidate_len = truncated.chars().count() + sentence.chars().count() + 1;
        if candidate_len > target {
            break;
        }
        truncated.push_str(sentence);
        truncated.push('.');
    }

    if truncated.is_empty() {
        // No sentence boundary fits; hard-cut and close the sentence
        truncated = text.chars().take(target - 1).collect();
        truncated.push('.');
    }

    truncated.trim().to_string()
}

fn has_greeting(text: &str) -> bool {
    GREETINGS.iter().any(|g| text.contains(g))
}

fn greeting_for(tone: Tone) -> &'static str {
    match tone {
        Tone::Official => "안녕하십니까",
        Tone::Formal | Tone::Friendly => "안녕하세요",
    }
}

fn has_info_notice(text: &str) -> bool {
    INFO_NOTICE_TOKENS.iter().any(|t| text.contains(t))
}

fn info_notice_for(service_type: ServiceType) -> &'static str {
    match service_type {
        ServiceType::Application => "※ 이 메시지는 서비스를 신청하신 분들께 발송되는 정보성 안내입니다.",
        ServiceType::Reservation => "※ 이 메시지는 예약을 하신 분들께 발송되는 정보성 안내입니다.",
        ServiceType::Order => "※ 이 메시지는 주문을 하신 분들께 발송되는 정보성 안내입니다.",
        _ => "※ 이 메시지는 서비스 이용 관련 정보성 안내입니다.",
    }
}

/// The fixed fallback template used when generation fails outright.
fn fallback_template(analysis: &Analysis) -> Template {
    let text = format!(
        "안녕하세요 #{{수신자명}}님,\n\n요청하신 {} 관련 안내드립니다.\n\n자세한 내용은 아래 버튼을 통해 확인하실 수 있습니다.\n\n※ 이 메시지는 서비스 이용 관련 정보성 안내입니다.",
        analysis.service_type.korean()
    );

    build_template(
        text,
        vec!["수신자명".to_string()],
        Some("자세히 보기".to_string()),
        analysis,
        GenerationMethod::Fallback,
    )
}

fn build_template(
    text: String,
    variables: Vec<String>,
    button_suggestion: Option<String>,
    analysis: &Analysis,
    generation_method: GenerationMethod,
) -> Template {
    let estimated_length = text.chars().count();
    let variable_count = variables.len();

    Template {
        text,
        variables,
        button_suggestion,
        metadata: TemplateMetadata {
            category_1: analysis.estimated_category.category_1.clone(),
            category_2: analysis.estimated_category.category_2.clone(),
            business_type: analysis.business_type,
            service_type: analysis.service_type,
            estimated_length,
            variable_count,
            target_audience: analysis.target_audience.clone(),
            tone: analysis.tone,
            generation_method,
        },
    }
}
