use std::cmp::Ordering;

use super::condition::Condition;
use super::criteria::Criteria;
use super::dimension::Dimension;
use super::policy::PolicySet;

/// One compiled rule: a conjunction of conditions and the policies it selects.
///
/// The conjunction already includes every condition inherited from enclosing
/// indented blocks, and the policy set is complete, so matching never walks
/// back up the source tree. The fallback is a `RuleLine` with no conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub(crate) line: u32,
    pub(crate) depth: usize,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) policies: PolicySet,
}

impl RuleLine {
    /// 1-based source line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Number of enclosing condition lines in the source.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Number of conditions in the effective conjunction.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.conditions.len()
    }

    #[must_use]
    pub fn constrains(&self, dimension: Dimension) -> bool {
        self.conditions.iter().any(|c| c.dimension == dimension)
    }

    #[must_use]
    pub fn matches(&self, criteria: &Criteria) -> bool {
        self.conditions.iter().all(|c| c.is_satisfied_by(criteria))
    }
}

/// Which of two otherwise indistinguishable lines wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTieBreak {
    /// The line declared later in the source wins.
    #[default]
    LastLine,
    /// The line declared earlier in the source wins.
    FirstLine,
}

/// The `priority:` directive of a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityOrder {
    dimensions: [Dimension; 7],
    tie_break: LineTieBreak,
}

impl PriorityOrder {
    pub(crate) fn new(dimensions: [Dimension; 7], tie_break: LineTieBreak) -> Self {
        Self {
            dimensions,
            tie_break,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension; 7] {
        &self.dimensions
    }

    #[must_use]
    pub fn tie_break(&self) -> LineTieBreak {
        self.tie_break
    }

    /// Ranking between two matching lines. `Ordering::Less` means `a` ranks
    /// ahead of `b`.
    ///
    /// More conditions rank first. Equal counts are settled by the first
    /// dimension in priority order that exactly one of the two constrains,
    /// and after that by declaration order.
    #[must_use]
    pub fn rank(&self, a: &RuleLine, b: &RuleLine) -> Ordering {
        b.specificity()
            .cmp(&a.specificity())
            .then_with(|| {
                self.dimensions
                    .iter()
                    .map(|&dim| b.constrains(dim).cmp(&a.constrains(dim)))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| match self.tie_break {
                LineTieBreak::LastLine => b.line.cmp(&a.line),
                LineTieBreak::FirstLine => a.line.cmp(&b.line),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicySet;

    fn line(number: u32, conditions: Vec<Condition>) -> RuleLine {
        RuleLine {
            line: number,
            depth: 0,
            conditions,
            policies: PolicySet::new("l", "r", "n", "o", "i"),
        }
    }

    fn order(tie_break: LineTieBreak) -> PriorityOrder {
        PriorityOrder::new(Dimension::ALL, tie_break)
    }

    #[test]
    fn more_conditions_rank_first() {
        let broad = line(3, vec![Condition::is(Dimension::MaterialType, "x")]);
        let narrow = line(
            4,
            vec![
                Condition::is(Dimension::MaterialType, "x"),
                Condition::is(Dimension::PatronGroup, "y"),
            ],
        );
        assert_eq!(order(LineTieBreak::LastLine).rank(&narrow, &broad), Ordering::Less);
        assert_eq!(order(LineTieBreak::LastLine).rank(&broad, &narrow), Ordering::Greater);
    }

    #[test]
    fn earlier_priority_dimension_wins_ties() {
        let by_loan_type = line(3, vec![Condition::is(Dimension::LoanType, "t1")]);
        let by_group = line(4, vec![Condition::is(Dimension::PatronGroup, "g1")]);
        // `t` precedes `g` in the default order, declaration order is irrelevant
        assert_eq!(
            order(LineTieBreak::LastLine).rank(&by_loan_type, &by_group),
            Ordering::Less
        );
    }

    #[test]
    fn full_tie_resolved_by_declaration_order() {
        let first = line(3, vec![Condition::is(Dimension::MaterialType, "a")]);
        let second = line(7, vec![Condition::is(Dimension::MaterialType, "b")]);
        assert_eq!(order(LineTieBreak::LastLine).rank(&second, &first), Ordering::Less);
        assert_eq!(order(LineTieBreak::FirstLine).rank(&first, &second), Ordering::Less);
    }

    #[test]
    fn line_is_equal_to_itself() {
        let l = line(3, vec![Condition::is(Dimension::MaterialType, "a")]);
        assert_eq!(order(LineTieBreak::LastLine).rank(&l, &l), Ordering::Equal);
    }

    #[test]
    fn fallback_has_no_conditions() {
        let fallback = line(2, vec![]);
        assert_eq!(fallback.specificity(), 0);
        assert!(!fallback.constrains(Dimension::LoanType));
    }
}
