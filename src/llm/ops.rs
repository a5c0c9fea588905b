//! Typed LLM operations: analyze / generate / review.
//!
//! The model returns free-form JSON. Each operation unwraps code fences,
//! parses defensively (unknown fields ignored, known fields defaulted), and
//! surfaces a `Parse` error only when nothing usable came back; the calling
//! stage then applies its documented fallback.

use serde_json::Value;
use std::sync::Arc;

use super::client::ChatClient;
use super::prompts;
use crate::domain::{
    Analysis, ApprovedTemplate, BusinessType, EstimatedCategory, ServiceType, Tone, Urgency,
};
use crate::error::{AlimgenError, Result};

/// Raw generation output before post-processing.
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    pub template_text: String,
    pub variables: Vec<String>,
    pub button_suggestion: Option<String>,
}

/// Advisory review result from the model.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub is_compliant: bool,
    pub compliance_score: f64,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ReviewOutcome {
    /// Neutral outcome used when the reviewer is unavailable.
    pub fn neutral() -> Self {
        Self {
            is_compliant: true,
            compliance_score: 80.0,
            violations: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// The three pipeline-facing LLM operations over a chat client.
pub struct LlmOps {
    chat: Arc<dyn ChatClient>,
}

impl LlmOps {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    pub fn is_ready(&self) -> bool {
        self.chat.is_ready()
    }

    pub fn model(&self) -> String {
        self.chat.model().to_string()
    }

    /// Classify a raw request into the Analysis shape.
    pub async fn analyze(&self, user_request: &str) -> Result<Analysis> {
        let response = self
            .chat
            .complete(&prompts::analysis_system(), &prompts::analysis_user(user_request))
            .await?;
        let value = extract_json(&response)?;
        Ok(parse_analysis(&value))
    }

    /// Produce a draft template for an analysis and policy summary.
    pub async fn generate(
        &self,
        analysis: &Analysis,
        policy_summary: &str,
        examples: &[ApprovedTemplate],
    ) -> Result<GeneratedDraft> {
        let system = prompts::generation_system(analysis, policy_summary, examples);
        let user = prompts::generation_user(analysis);
        let response = self.chat.complete(&system, &user).await?;
        let value = extract_json(&response)?;

        let template_text = value["template_text"].as_str().unwrap_or("").to_string();
        if template_text.trim().is_empty() {
            return Err(AlimgenError::Parse("generation response missing template_text".to_string()));
        }

        Ok(GeneratedDraft {
            template_text,
            variables: string_array(&value["variables"]),
            button_suggestion: value["button_suggestion"]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        })
    }

    /// Advisory policy review of a template text.
    pub async fn review(&self, template_text: &str) -> Result<ReviewOutcome> {
        let response = self.chat.complete(&prompts::review_system(template_text), "").await?;
        let value = extract_json(&response)?;

        let compliance_score = value
            .get("compliance_score")
            .or_else(|| value.get("score"))
            .and_then(Value::as_f64)
            .unwrap_or(80.0)
            .clamp(0.0, 100.0);

        Ok(ReviewOutcome {
            is_compliant: value["is_compliant"].as_bool().unwrap_or(compliance_score >= 80.0),
            compliance_score,
            violations: string_array(&value["violations"]),
            recommendations: string_array(&value["recommendations"]),
        })
    }
}

/// Parse a JSON object out of a model response: direct parse first, then a
/// fenced json code block, then the outermost brace span.
fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let Some(fenced) = unfence(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced.trim()) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    Err(AlimgenError::Parse(format!(
        "no JSON object in model response: {}",
        trimmed.chars().take(80).collect::<String>()
    )))
}

fn unfence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(&after[..end])
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_analysis(value: &Value) -> Analysis {
    let business_type = BusinessType::parse_or_default(value["business_type"].as_str().unwrap_or(""));
    let service_type = ServiceType::parse_or_default(value["service_type"].as_str().unwrap_or(""));

    let mut required_variables = string_array(&value["required_variables"]);
    if required_variables.is_empty() {
        required_variables.push("수신자명".to_string());
    }

    Analysis {
        business_type,
        service_type,
        message_purpose: value["message_purpose"].as_str().unwrap_or("일반 안내").to_string(),
        target_audience: value["target_audience"].as_str().unwrap_or("고객").to_string(),
        tone: Tone::parse_or_default(value["tone"].as_str().unwrap_or("")),
        urgency: Urgency::parse_or_default(value["urgency"].as_str().unwrap_or("")),
        required_variables,
        estimated_category: EstimatedCategory::for_types(business_type, service_type),
        compliance_concerns: Vec::new(),
        compliance_feedback: None,
    }
}
