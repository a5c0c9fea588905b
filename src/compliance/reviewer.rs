//! Advisory model-based compliance review.
//!
//! Intentionally narrow and cheap. The deterministic rule checker is the
//! authoritative signal; this reviewer contributes 10% of the weighted score
//! and degrades to a neutral outcome whenever the model is unavailable.

use std::sync::Arc;

use crate::llm::{LlmOps, ReviewOutcome};

pub struct LlmReviewer {
    ops: Arc<LlmOps>,
}

impl LlmReviewer {
    pub fn new(ops: Arc<LlmOps>) -> Self {
        Self { ops }
    }

    /// Review a template text. Any failure yields the neutral outcome plus
    /// an error annotation for workflow bookkeeping.
    pub async fn review(&self, template_text: &str) -> (ReviewOutcome, Option<String>) {
        match self.ops.review(template_text).await {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                log::warn!("LLM review degraded to neutral: {}", e);
                (ReviewOutcome::neutral(), Some(format!("{}: {}", e.code(), e)))
            }
        }
    }
}
