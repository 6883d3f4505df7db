use async_trait::async_trait;

use crate::TenantId;

/// Where a tenant's rule text comes from.
///
/// The cache calls this on every compile, so implementations should not
/// cache on their own.
#[async_trait]
pub trait RuleTextSource: Send + Sync + 'static {
    /// Fetch the current rule text for `tenant`.
    ///
    /// # Errors
    ///
    /// [`SourceError::NotFound`] when the tenant has no rule text, and
    /// [`SourceError::Unavailable`] when the backing store cannot be reached.
    async fn fetch_rule_text(&self, tenant: &TenantId) -> Result<String, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("no circulation rules stored for tenant '{0}'")]
    NotFound(TenantId),

    #[error("rule text source unavailable: {0}")]
    Unavailable(String),
}
