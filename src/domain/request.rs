//! Incoming template generation request.

use serde::{Deserialize, Serialize};

use super::analysis::{BusinessType, ServiceType, Tone};

/// Maximum length of the free-form user request, in characters.
pub const MAX_REQUEST_CHARS: usize = 1000;

/// A user's natural-language request for an AlimTalk template, plus optional
/// hints. Created by the transport layer, consumed once by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRequest {
    /// Free-form Korean request text (≤1000 chars, validated at the boundary)
    pub user_request: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<BusinessType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_variables: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_requirements: Option<String>,
}

impl TemplateRequest {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            business_type: None,
            service_type: None,
            tone: None,
            required_variables: Vec::new(),
            additional_requirements: None,
        }
    }

    /// Boundary validation: non-empty, within the character cap.
    pub fn validate(&self) -> crate::Result<()> {
        let trimmed = self.user_request.trim();
        if trimmed.is_empty() {
            return Err(crate::AlimgenError::Validation("user_request is empty".to_string()));
        }
        let chars = self.user_request.chars().count();
        if chars > MAX_REQUEST_CHARS {
            return Err(crate::AlimgenError::Validation(format!(
                "user_request exceeds {} chars ({})",
                MAX_REQUEST_CHARS, chars
            )));
        }
        Ok(())
    }
}
