//! alimgen - policy-compliant KakaoTalk AlimTalk template generation
//!
//! A free-form Korean request flows through a staged pipeline: request
//! analysis, hybrid policy retrieval, template generation, and compliance
//! checking, with a bounded refinement loop feeding verdict feedback back
//! into generation until the quality bar is met.

pub mod analyzer;
pub mod cache;
pub mod compliance;
pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod llm;
pub mod rag;
pub mod search;
pub mod service;
pub mod workflow;

pub use error::{AlimgenError, Result};
