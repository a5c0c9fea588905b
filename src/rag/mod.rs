//! Retrieval-augmented context: policy context assembly and the
//! approved-template store used for few-shot examples.

pub mod context;
pub mod store;

pub use context::{ContextKind, PolicyContext, PolicyContextBuilder};
pub use store::TemplateStore;
