//! LLM layer: chat client abstraction, Anthropic implementation, compact
//! per-stage prompts, and the typed analyze/generate/review operations.

pub mod anthropic;
pub mod client;
pub mod ops;
pub mod prompts;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{ChatClient, ScriptedChatClient};
pub use ops::{GeneratedDraft, LlmOps, ReviewOutcome};
