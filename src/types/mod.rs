mod condition;
mod criteria;
mod dimension;
mod error;
mod policy;
mod rule;
mod rule_match;
mod ruleset;

pub use condition::{Condition, Pattern};
pub use criteria::{Criteria, Location};
pub use dimension::{Dimension, PolicyKind};
pub use error::CompileError;
pub(crate) use policy::PartialPolicySet;
pub use policy::PolicySet;
pub use rule::{LineTieBreak, PriorityOrder, RuleLine};
pub use rule_match::{PolicyMatch, RuleMatch};
pub use ruleset::CompiledRuleSet;
