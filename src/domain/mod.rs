//! Core data model: requests, analyses, policy documents, templates, verdicts.

pub mod analysis;
pub mod policy;
pub mod request;
pub mod template;
pub mod verdict;

pub use analysis::{
    Analysis, BusinessType, ComplianceFeedback, EstimatedCategory, ServiceType, Tone, Urgency,
};
pub use policy::{ApprovalStatus, ApprovedTemplate, ApprovedTemplateMetadata, PolicyChunk, PolicyType};
pub use request::TemplateRequest;
pub use template::{GenerationMethod, Template, TemplateMetadata};
pub use verdict::{ApprovalProbability, ComplianceVerdict, DetailedScores};
