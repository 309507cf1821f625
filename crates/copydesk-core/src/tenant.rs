//! Tenant context threaded unchanged through every phase of a request.

use serde::{Deserialize, Serialize};

/// Company profile for the tenant issuing a request.
///
/// Fetched once per top-level request and read-only afterwards. An absent
/// profile is the empty string, never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Tenant identifier, used to scope document search.
    pub tenant_id: String,
    /// Free-text company description. Empty when unknown.
    #[serde(default)]
    pub company_context: String,
}

impl TenantContext {
    /// Build a tenant context.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, company_context: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            company_context: company_context.into(),
        }
    }

    /// Returns `true` if a non-blank company description is present.
    #[must_use]
    pub fn has_company_context(&self) -> bool {
        !self.company_context.trim().is_empty()
    }

    /// Prompt section describing the company, or the empty string.
    #[must_use]
    pub fn prompt_section(&self) -> String {
        if self.has_company_context() {
            format!("Company context:\n{}\n", self.company_context.trim())
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_renders_nothing() {
        let ctx = TenantContext::new("acme", "   ");
        assert!(!ctx.has_company_context());
        assert_eq!(ctx.prompt_section(), "");
    }

    #[test]
    fn context_section_is_trimmed() {
        let ctx = TenantContext::new("acme", "  Acme builds rockets.\n");
        assert_eq!(ctx.prompt_section(), "Company context:\nAcme builds rockets.\n");
    }
}
