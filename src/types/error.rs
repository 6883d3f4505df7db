use thiserror::Error;

use super::{Dimension, PolicyKind};
use crate::parse::ParseError;

/// Reasons rule text fails to compile.
///
/// Line numbers are 1-based and refer to the source text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("invalid priority directive at line {line}: {reason}")]
    InvalidPriorityDirective { line: u32, reason: String },

    #[error("no fallback-policy line; exactly one is required")]
    MissingFallback,

    #[error("duplicate fallback-policy at line {line} (first declared at line {first})")]
    DuplicateFallback { line: u32, first: u32 },

    #[error("fallback-policy at line {line} does not assign a {kind} policy")]
    IncompleteFallback { line: u32, kind: PolicyKind },

    #[error("{dimension} constrained more than once at line {line}")]
    DuplicateCondition { line: u32, dimension: Dimension },

    #[error("{kind} policy assigned more than once at line {line}")]
    DuplicatePolicy { line: u32, kind: PolicyKind },

    #[error("unknown token '{token}' at line {line}")]
    UnknownToken { line: u32, token: String },

    #[error("bad indentation at line {line}")]
    BadIndentation { line: u32 },
}

impl CompileError {
    /// The source line the error points at, if it points at one.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Syntax(e) => Some(e.line()),
            CompileError::MissingFallback => None,
            CompileError::InvalidPriorityDirective { line, .. }
            | CompileError::DuplicateFallback { line, .. }
            | CompileError::IncompleteFallback { line, .. }
            | CompileError::DuplicateCondition { line, .. }
            | CompileError::DuplicatePolicy { line, .. }
            | CompileError::UnknownToken { line, .. }
            | CompileError::BadIndentation { line } => Some(*line),
        }
    }
}
