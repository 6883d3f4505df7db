use thiserror::Error;

use crate::{CacheError, ResolveError};

/// A request parameter that is missing or not a UUID.
///
/// Messages name the offending query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required query parameter '{field}' is missing")]
    Missing { field: &'static str },

    #[error("query parameter '{field}' must be a uuid, got '{value}'")]
    InvalidUuid { field: &'static str, value: String },
}

impl ValidationError {
    /// Name of the query parameter at fault.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field } | ValidationError::InvalidUuid { field, .. } => {
                field
            }
        }
    }
}

/// Everything [`RulesEngine`](crate::RulesEngine) can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rules(#[from] CacheError),

    #[error(transparent)]
    Location(#[from] ResolveError),
}

impl EngineError {
    /// `true` when the caller sent a bad request, as opposed to a fault in
    /// the rule text or a collaborator.
    ///
    /// A well-formed location id that does not exist counts as the caller's
    /// fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::Validation(_) | EngineError::Location(ResolveError::NotFound(_)) => true,
            EngineError::Location(ResolveError::Unavailable(_)) | EngineError::Rules(_) => false,
        }
    }
}
