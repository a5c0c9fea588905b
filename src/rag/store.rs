//! In-memory store of previously approved templates.
//!
//! Records come from an external loader; the store only filters and ranks.

use crate::domain::{Analysis, ApprovalStatus, ApprovedTemplate, BusinessType, ServiceType};

pub struct TemplateStore {
    templates: Vec<ApprovedTemplate>,
}

impl TemplateStore {
    pub fn new(templates: Vec<ApprovedTemplate>) -> Self {
        Self { templates }
    }

    pub fn empty() -> Self {
        Self { templates: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Approved templates for a business type, capped at `limit`.
    pub fn by_business_type(&self, business_type: BusinessType, limit: usize) -> Vec<ApprovedTemplate> {
        self.templates
            .iter()
            .filter(|t| t.metadata.business_type == business_type)
            .filter(|t| t.metadata.approval_status == ApprovalStatus::Approved)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn by_category(&self, category_1: &str, category_2: &str) -> Vec<ApprovedTemplate> {
        self.templates
            .iter()
            .filter(|t| t.metadata.category_1 == category_1 && t.metadata.category_2 == category_2)
            .filter(|t| t.metadata.approval_status == ApprovalStatus::Approved)
            .cloned()
            .collect()
    }

    pub fn approved(&self) -> Vec<ApprovedTemplate> {
        self.templates
            .iter()
            .filter(|t| t.metadata.approval_status == ApprovalStatus::Approved)
            .cloned()
            .collect()
    }

    /// Approved templates matching either the business or the service type.
    pub fn find_similar(&self, business_type: BusinessType, service_type: ServiceType, k: usize) -> Vec<ApprovedTemplate> {
        self.templates
            .iter()
            .filter(|t| t.metadata.approval_status == ApprovalStatus::Approved)
            .filter(|t| {
                t.metadata.business_type == business_type || t.metadata.service_type == service_type
            })
            .take(k)
            .cloned()
            .collect()
    }

    /// Few-shot examples for generation, widening the filter until at least
    /// two candidates exist: exact similarity, business type, category, then
    /// any approved template.
    pub fn few_shot(&self, analysis: &Analysis) -> Vec<ApprovedTemplate> {
        let exact = self.find_similar(analysis.business_type, analysis.service_type, 3);
        if exact.len() >= 2 {
            return exact;
        }

        let by_business = self.by_business_type(analysis.business_type, 3);
        if by_business.len() >= 2 {
            return by_business;
        }

        let by_category = self.by_category(
            &analysis.estimated_category.category_1,
            &analysis.estimated_category.category_2,
        );
        if !by_category.is_empty() {
            return by_category.into_iter().take(3).collect();
        }

        self.approved().into_iter().take(3).collect()
    }
}
