use std::fmt;

use super::{Criteria, Dimension};

/// What a condition accepts for its dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*` or `all`: any value.
    Any,
    /// One or more identifiers, any of which satisfies the condition.
    OneOf(Vec<String>),
    /// `!a b ...`: satisfied by any value not in the list.
    NoneOf(Vec<String>),
}

impl Pattern {
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::OneOf(ids) => ids.iter().any(|id| id == value),
            Pattern::NoneOf(ids) => ids.iter().all(|id| id != value),
        }
    }
}

/// A single `(dimension, pattern)` term of a rule line's conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub dimension: Dimension,
    pub pattern: Pattern,
}

impl Condition {
    #[must_use]
    pub fn new(dimension: Dimension, pattern: Pattern) -> Self {
        Self { dimension, pattern }
    }

    /// Shorthand for a single-identifier condition.
    #[must_use]
    pub fn is(dimension: Dimension, id: impl Into<String>) -> Self {
        Self::new(dimension, Pattern::OneOf(vec![id.into()]))
    }

    #[must_use]
    pub fn is_satisfied_by(&self, criteria: &Criteria) -> bool {
        self.pattern.accepts(criteria.value(self.dimension))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dimension.code())?;
        match &self.pattern {
            Pattern::Any => write!(f, " *"),
            Pattern::OneOf(ids) => write!(f, " {}", ids.join(" ")),
            Pattern::NoneOf(ids) => write!(f, " !{}", ids.join(" ")),
        }
    }
}
