use crate::{CompiledRuleSet, Criteria, RuleLine, RuleMatch};

/// The single highest-ranked matching line, or the fallback when no line
/// matches.
#[must_use]
pub fn match_best(rules: &CompiledRuleSet, criteria: &Criteria) -> RuleMatch {
    // `rank` is a total order over distinct lines, so a single pass finds the
    // winner regardless of iteration order.
    let best = matching(rules, criteria).fold(&rules.fallback, |best, line| {
        if rules.priority.rank(line, best).is_lt() {
            line
        } else {
            best
        }
    });
    RuleMatch::from_line(best)
}

/// Every matching line in rank order, always ending with the fallback.
#[must_use]
pub fn match_all(rules: &CompiledRuleSet, criteria: &Criteria) -> Vec<RuleMatch> {
    let mut hits: Vec<&RuleLine> = matching(rules, criteria).collect();
    hits.sort_by(|a, b| rules.priority.rank(a, b));
    hits.push(&rules.fallback);
    hits.into_iter().map(RuleMatch::from_line).collect()
}

fn matching<'a>(
    rules: &'a CompiledRuleSet,
    criteria: &'a Criteria,
) -> impl Iterator<Item = &'a RuleLine> {
    rules.lines.iter().filter(move |line| line.matches(criteria))
}
