use async_trait::async_trait;

use crate::{Location, TenantId};

/// Expands a shelving location id into its place in the location hierarchy.
#[async_trait]
pub trait LocationResolver: Send + Sync + 'static {
    /// # Errors
    ///
    /// [`ResolveError::NotFound`] for an unknown location id,
    /// [`ResolveError::Unavailable`] when the lookup itself failed.
    async fn resolve_location(
        &self,
        tenant: &TenantId,
        location_id: &str,
    ) -> Result<Location, ResolveError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("location '{0}' not found")]
    NotFound(String),

    #[error("location lookup unavailable: {0}")]
    Unavailable(String),
}
