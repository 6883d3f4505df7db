use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::dimension::{Dimension, PolicyKind};
use super::policy::PolicySet;
use super::rule::RuleLine;

/// A rule line that applies to a set of criteria, with the policies it
/// resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RuleMatch {
    line: u32,
    conditions: Vec<Dimension>,
    policies: PolicySet,
}

impl fmt::Display for RuleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.policies)
    }
}

impl RuleMatch {
    pub(crate) fn from_line(rule: &RuleLine) -> Self {
        Self {
            line: rule.line(),
            conditions: rule.conditions().iter().map(|c| c.dimension).collect(),
            policies: rule.policies().clone(),
        }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Zero for the fallback.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.conditions.len()
    }

    /// The dimensions the matched line constrains, inherited ones first.
    /// Empty for the fallback.
    #[must_use]
    pub fn applied_conditions(&self) -> &[Dimension] {
        &self.conditions
    }

    #[must_use]
    pub fn constrains(&self, dimension: Dimension) -> bool {
        self.conditions.contains(&dimension)
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn policy(&self, kind: PolicyKind) -> PolicyMatch {
        PolicyMatch {
            kind,
            policy_id: self.policies.get(kind).to_owned(),
            line: self.line,
        }
    }
}

/// One policy id and the line that produced it.
///
/// Serializes as `{"loanPolicyId": "...", "circulationRuleLine": 7}`, with
/// the id key named after the policy kind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PolicyMatch {
    kind: PolicyKind,
    policy_id: String,
    line: u32,
}

impl PolicyMatch {
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    #[must_use]
    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for PolicyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (line {})", self.kind.code(), self.policy_id, self.line)
    }
}

impl Serialize for PolicyMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.kind.id_key(), &self.policy_id)?;
        map.serialize_entry("circulationRuleLine", &self.line)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RuleMatch {
        RuleMatch {
            line: 7,
            conditions: vec![Dimension::MaterialType, Dimension::PatronGroup],
            policies: PolicySet::new("lp", "rp", "np", "op", "ip"),
        }
    }

    #[test]
    fn policy_carries_line() {
        let p = sample().policy(PolicyKind::Notice);
        assert_eq!(p.policy_id(), "np");
        assert_eq!(p.line(), 7);
        assert_eq!(p.kind(), PolicyKind::Notice);
    }

    #[test]
    fn specificity_counts_applied_conditions() {
        let m = sample();
        assert_eq!(m.specificity(), 2);
        assert!(m.constrains(Dimension::PatronGroup));
        assert!(!m.constrains(Dimension::LoanType));
    }

    #[test]
    fn display() {
        assert_eq!(sample().to_string(), "line 7: l lp r rp n np o op i ip");
        assert_eq!(sample().policy(PolicyKind::Loan).to_string(), "l lp (line 7)");
    }

    #[test]
    fn serializes_with_kind_specific_key() {
        let json = serde_json::to_value(sample().policy(PolicyKind::OverdueFine)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "overdueFinePolicyId": "op", "circulationRuleLine": 7 })
        );
    }
}
