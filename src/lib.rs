//! Circulation rules: which loan, request, notice, overdue-fine and
//! lost-item-fee policy applies to a patron borrowing an item at a location.
//!
//! Rule text is compiled into an immutable [`CompiledRuleSet`], matched with
//! [`CompiledRuleSet::match_best`] / [`CompiledRuleSet::match_all`], and kept
//! per tenant by a [`TenantRuleCache`]. [`RulesEngine`] validates raw request
//! identifiers and runs the whole pipeline.

mod cache;
mod compile;
mod config;
mod engine;
mod error;
mod evaluate;
#[cfg(feature = "memory-store")]
mod memory;
pub mod parse;
mod resolve;
mod source;
mod tenant;
mod types;

pub use cache::{CacheEntry, CacheError, TenantRuleCache};
pub use config::CacheConfig;
pub use engine::{
    RawCriteria, RulesEngine, ValidCriteria, ITEM_TYPE_ID, LOAN_TYPE_ID, LOCATION_ID,
    PATRON_TYPE_ID,
};
pub use error::{EngineError, ValidationError};
pub use evaluate::{match_all, match_best};
#[cfg(feature = "memory-store")]
pub use memory::{MemoryLocations, MemoryRuleStore};
pub use resolve::{LocationResolver, ResolveError};
pub use source::{RuleTextSource, SourceError};
pub use tenant::TenantId;
pub use types::{
    CompileError, CompiledRuleSet, Condition, Criteria, Dimension, LineTieBreak, Location,
    Pattern, PolicyKind, PolicyMatch, PolicySet, PriorityOrder, RuleLine, RuleMatch,
};

/// Compile rule text. Same as [`CompiledRuleSet::from_text`].
///
/// # Errors
///
/// Returns [`CompileError`] for the first problem found in `text`.
pub fn compile(text: &str) -> Result<CompiledRuleSet, CompileError> {
    compile::compile(text)
}
