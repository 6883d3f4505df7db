use std::fmt;

use super::criteria::Criteria;
use super::error::CompileError;
use super::rule::{PriorityOrder, RuleLine};
use super::rule_match::RuleMatch;

/// An immutable, compiled set of circulation rules.
///
/// Produced from rule text by [`CompiledRuleSet::from_text`]. Once built it
/// is never modified, so a single instance can be shared across threads
/// behind an `Arc` and matched against concurrently.
///
/// # Example
///
/// ```
/// use circ_rules::{CompiledRuleSet, Criteria, Location, PolicyKind};
///
/// let rules = CompiledRuleSet::from_text(
///     "priority: t, s, c, b, a, m, g\n\
///      fallback-policy: l loan-default r req n note o fine i lost\n\
///      m book: l loan-books\n",
/// )
/// .unwrap();
///
/// let criteria = Criteria::new("book", "any", "any", Location::new("s", "c", "b", "a"));
/// let hit = rules.match_best(&criteria);
/// assert_eq!(hit.policies().get(PolicyKind::Loan), "loan-books");
/// assert_eq!(hit.policies().get(PolicyKind::Request), "req");
/// ```
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    pub(crate) lines: Vec<RuleLine>,
    pub(crate) fallback: RuleLine,
    pub(crate) priority: PriorityOrder,
    pub(crate) digest: [u8; 32],
}

impl CompiledRuleSet {
    /// Compile rule text.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] describing the first problem found, with its
    /// line number where one applies.
    pub fn from_text(text: &str) -> Result<Self, CompileError> {
        crate::compile::compile(text)
    }

    /// BLAKE3 digest of rule text, as stored by [`CompiledRuleSet::digest`].
    #[must_use]
    pub fn source_digest(text: &str) -> [u8; 32] {
        *blake3::hash(text.as_bytes()).as_bytes()
    }

    /// Lines that assign at least one policy, in source order. The fallback
    /// is not included.
    #[must_use]
    pub fn lines(&self) -> &[RuleLine] {
        &self.lines
    }

    #[must_use]
    pub fn fallback(&self) -> &RuleLine {
        &self.fallback
    }

    #[must_use]
    pub fn priority(&self) -> &PriorityOrder {
        &self.priority
    }

    /// Digest of the text this set was compiled from.
    #[must_use]
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Number of rule lines, not counting the fallback.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The highest-ranked line matching `criteria`, or the fallback.
    pub fn match_best(&self, criteria: &Criteria) -> RuleMatch {
        crate::evaluate::match_best(self, criteria)
    }

    /// Every line matching `criteria`, best first, with the fallback last.
    #[must_use]
    pub fn match_all(&self, criteria: &Criteria) -> Vec<RuleMatch> {
        crate::evaluate::match_all(self, criteria)
    }
}

impl fmt::Display for CompiledRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompiledRuleSet({} lines, fallback at line {})",
            self.lines.len(),
            self.fallback.line()
        )
    }
}
