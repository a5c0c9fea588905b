//! Generated template and its metadata.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::analysis::{BusinessType, ServiceType, Tone};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\{([^}]+)\}").unwrap());

/// Hard platform limits on a template.
pub const MAX_TEMPLATE_CHARS: usize = 1000;
pub const MAX_VARIABLES: usize = 40;

/// How the template text came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    AiGenerated,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub category_1: String,
    pub category_2: String,
    pub business_type: BusinessType,
    pub service_type: ServiceType,
    /// Character count of the final text
    pub estimated_length: usize,
    pub variable_count: usize,
    pub target_audience: String,
    pub tone: Tone,
    pub generation_method: GenerationMethod,
}

/// A draft or final AlimTalk template.
///
/// Invariants maintained by the generator's post-processing: text ≤1000
/// chars, every `#{name}` in the text appears in `variables`, variables are
/// deduplicated in first-occurrence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub text: String,
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_suggestion: Option<String>,
    pub metadata: TemplateMetadata,
}

impl Template {
    /// Character count (not byte length; template text is Korean).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Distinct `#{name}` placeholder names in first-occurrence order.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    PLACEHOLDER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Template text with every placeholder removed.
pub fn strip_variables(text: &str) -> String {
    PLACEHOLDER.replace_all(text, "").to_string()
}
