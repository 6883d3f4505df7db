use crate::parse::{Assignment, Criterion, PriorityItem, SourceLine, Statement};
use crate::types::PartialPolicySet;
use crate::{
    CompileError, CompiledRuleSet, Condition, Dimension, LineTieBreak, Pattern, PolicyKind,
    PolicySet, PriorityOrder, RuleLine,
};

/// An open condition line that later, deeper-indented lines nest under.
struct Frame {
    indent: usize,
    conditions: Vec<Condition>,
    policies: PartialPolicySet,
}

/// A rule line whose policy gaps are filled once the fallback is known.
struct PendingLine {
    line: u32,
    depth: usize,
    conditions: Vec<Condition>,
    policies: PartialPolicySet,
}

pub(crate) fn compile(text: &str) -> Result<CompiledRuleSet, CompileError> {
    let parsed = crate::parse::parse(text)?;
    let mut source = parsed.lines.into_iter();

    let priority_line = source
        .next()
        .ok_or_else(|| CompileError::InvalidPriorityDirective {
            line: 1,
            reason: "rule text is empty".to_owned(),
        })?;
    let priority = priority_directive(&priority_line)?;

    let mut fallback: Option<(u32, PolicySet)> = None;
    let mut stack: Vec<Frame> = Vec::new();
    let mut pending: Vec<PendingLine> = Vec::new();

    for src in source {
        let line = src.number;
        if src.tabbed {
            return Err(CompileError::BadIndentation { line });
        }
        match src.statement {
            Statement::Priority(_) | Statement::MalformedPriority(_) => {
                return Err(CompileError::InvalidPriorityDirective {
                    line,
                    reason: format!("priority already declared at line {}", priority_line.number),
                });
            }
            Statement::Fallback(assignments) => {
                if src.indent > 0 {
                    return Err(CompileError::BadIndentation { line });
                }
                if let Some((first, _)) = &fallback {
                    return Err(CompileError::DuplicateFallback {
                        line,
                        first: *first,
                    });
                }
                let policies = policy_assignments(&assignments, line)?
                    .into_complete()
                    .map_err(|kind| CompileError::IncompleteFallback { line, kind })?;
                fallback = Some((line, policies));
                stack.clear();
            }
            Statement::Rule {
                criteria,
                assignments,
            } => {
                while stack.last().is_some_and(|f| f.indent >= src.indent) {
                    stack.pop();
                }
                if src.indent > 0 && stack.is_empty() {
                    return Err(CompileError::BadIndentation { line });
                }

                let own_policies = policy_assignments(&assignments, line)?;
                let (mut conditions, policies) = match stack.last() {
                    Some(parent) => (
                        parent.conditions.clone(),
                        own_policies.over(&parent.policies),
                    ),
                    None => (Vec::new(), own_policies.clone()),
                };
                for criterion in &criteria {
                    let cond = condition(criterion, line)?;
                    if conditions.iter().any(|c| c.dimension == cond.dimension) {
                        return Err(CompileError::DuplicateCondition {
                            line,
                            dimension: cond.dimension,
                        });
                    }
                    conditions.push(cond);
                }

                // A line without assignments only narrows for its children.
                if !own_policies.is_empty() {
                    pending.push(PendingLine {
                        line,
                        depth: stack.len(),
                        conditions: conditions.clone(),
                        policies: policies.clone(),
                    });
                }
                stack.push(Frame {
                    indent: src.indent,
                    conditions,
                    policies,
                });
            }
        }
    }

    let (fallback_line, fallback_policies) = fallback.ok_or(CompileError::MissingFallback)?;

    let lines = pending
        .into_iter()
        .map(|p| RuleLine {
            line: p.line,
            depth: p.depth,
            conditions: p.conditions,
            policies: p.policies.complete(&fallback_policies),
        })
        .collect();

    Ok(CompiledRuleSet {
        lines,
        fallback: RuleLine {
            line: fallback_line,
            depth: 0,
            conditions: Vec::new(),
            policies: fallback_policies,
        },
        priority,
        digest: *blake3::hash(text.as_bytes()).as_bytes(),
    })
}

fn priority_directive(src: &SourceLine) -> Result<PriorityOrder, CompileError> {
    let line = src.number;
    let invalid = |reason: String| CompileError::InvalidPriorityDirective { line, reason };

    let items = match &src.statement {
        Statement::Priority(items) => items,
        Statement::MalformedPriority(raw) => {
            return Err(invalid(format!("cannot read '{raw}' as a comma-separated list")));
        }
        Statement::Fallback(_) | Statement::Rule { .. } => {
            return Err(invalid(
                "expected 'priority:' before any other line".to_owned(),
            ));
        }
    };
    if src.indent > 0 {
        return Err(CompileError::BadIndentation { line });
    }

    let mut codes: Vec<&str> = Vec::new();
    let mut tie_break = LineTieBreak::default();
    let last = items.len().saturating_sub(1);
    for (pos, item) in items.iter().enumerate() {
        match item {
            PriorityItem::Criterium(group) => codes.extend(group.iter().map(String::as_str)),
            PriorityItem::Word(w) if w == "number-of-criteria" && pos == 0 => {}
            PriorityItem::Word(w) if w == "last-line" && pos == last => {
                tie_break = LineTieBreak::LastLine;
            }
            PriorityItem::Word(w) if w == "first-line" && pos == last => {
                tie_break = LineTieBreak::FirstLine;
            }
            PriorityItem::Word(w) => codes.push(w),
        }
    }

    let mut dimensions: Vec<Dimension> = Vec::with_capacity(7);
    for code in codes {
        let dim = Dimension::from_token(code)
            .ok_or_else(|| invalid(format!("unknown criterion '{code}'")))?;
        if dimensions.contains(&dim) {
            return Err(invalid(format!("'{code}' listed more than once")));
        }
        dimensions.push(dim);
    }
    if let Some(missing) = Dimension::ALL.iter().find(|d| !dimensions.contains(d)) {
        return Err(invalid(format!("'{}' is not listed", missing.code())));
    }

    let dimensions: [Dimension; 7] = dimensions
        .try_into()
        .map_err(|_| invalid("expected exactly seven criteria".to_owned()))?;
    Ok(PriorityOrder::new(dimensions, tie_break))
}

fn condition(criterion: &Criterion, line: u32) -> Result<Condition, CompileError> {
    let dimension =
        Dimension::from_token(&criterion.letter).ok_or_else(|| CompileError::UnknownToken {
            line,
            token: criterion.letter.clone(),
        })?;

    let is_wildcard = |v: &String| v == "*" || v == "all";
    if let Some(wild) = criterion.values.iter().find(|v| is_wildcard(v)) {
        if criterion.negated || criterion.values.len() > 1 {
            let token = if criterion.negated {
                format!("!{wild}")
            } else {
                wild.clone()
            };
            return Err(CompileError::UnknownToken { line, token });
        }
        return Ok(Condition::new(dimension, Pattern::Any));
    }

    let pattern = if criterion.negated {
        Pattern::NoneOf(criterion.values.clone())
    } else {
        Pattern::OneOf(criterion.values.clone())
    };
    Ok(Condition::new(dimension, pattern))
}

fn policy_assignments(
    assignments: &[Assignment],
    line: u32,
) -> Result<PartialPolicySet, CompileError> {
    let mut policies = PartialPolicySet::default();
    for a in assignments {
        let kind = PolicyKind::from_token(&a.letter).ok_or_else(|| CompileError::UnknownToken {
            line,
            token: a.letter.clone(),
        })?;
        if !policies.assign(kind, a.id.clone()) {
            return Err(CompileError::DuplicatePolicy { line, kind });
        }
    }
    Ok(policies)
}

#[cfg(test)]
mod tests {
    use crate::{compile, CompileError, Dimension, LineTieBreak, Pattern, PolicyKind};

    const HEADER: &str = "priority: t, s, c, b, a, m, g\nfallback-policy: l fl r fr n fn o fo i fi\n";

    fn with_header(body: &str) -> String {
        format!("{HEADER}{body}")
    }

    #[test]
    fn compile_fallback_only() {
        let rules = compile(HEADER).unwrap();
        assert!(rules.lines().is_empty());
        assert_eq!(rules.fallback().line(), 2);
        assert_eq!(rules.fallback().policies().get(PolicyKind::Loan), "fl");
    }

    #[test]
    fn nested_lines_inherit_conditions() {
        let text = with_header("m book: l lp1\n    t rare: l lp2\n        g staff: l lp3\n");
        let rules = compile(&text).unwrap();
        let lines = rules.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].specificity(), 1);
        assert_eq!(lines[1].specificity(), 2);
        assert_eq!(lines[2].specificity(), 3);
        assert_eq!(lines[2].depth(), 2);
        assert!(lines[2].constrains(Dimension::MaterialType));
        assert!(lines[2].constrains(Dimension::LoanType));
        assert!(lines[2].constrains(Dimension::PatronGroup));
    }

    #[test]
    fn policies_inherit_from_ancestor_then_fallback() {
        let rules = compile(&with_header("m book: l lp1 r rp1\n    g staff: l lp2\n")).unwrap();
        let child = &rules.lines()[1];
        assert_eq!(child.policies().get(PolicyKind::Loan), "lp2");
        assert_eq!(child.policies().get(PolicyKind::Request), "rp1");
        assert_eq!(child.policies().get(PolicyKind::Notice), "fn");
        assert_eq!(child.policies().get(PolicyKind::LostItemFee), "fi");
    }

    #[test]
    fn narrowing_line_is_not_emitted() {
        let rules = compile(&with_header("m book + t rare :\n    g staff: l lp\n")).unwrap();
        assert_eq!(rules.lines().len(), 1);
        assert_eq!(rules.lines()[0].line(), 4);
        assert_eq!(rules.lines()[0].specificity(), 3);
    }

    #[test]
    fn dedent_closes_blocks() {
        let rules = compile(&with_header("m book: l a\n    g staff: l b\nt rare: l c\n")).unwrap();
        let last = &rules.lines()[2];
        assert_eq!(last.specificity(), 1);
        assert!(last.constrains(Dimension::LoanType));
        assert_eq!(last.depth(), 0);
    }

    #[test]
    fn fallback_may_follow_condition_lines() {
        let text = "priority: t, s, c, b, a, m, g\nm book: l lp\nfallback-policy: l fl r fr n fn o fo i fi\n";
        let rules = compile(text).unwrap();
        assert_eq!(rules.fallback().line(), 3);
        assert_eq!(rules.lines()[0].policies().get(PolicyKind::Request), "fr");
    }

    #[test]
    fn wildcard_and_lists() {
        let rules = compile(&with_header("g * + m !book dvd: l x\n")).unwrap();
        let conds = rules.lines()[0].conditions();
        assert_eq!(conds[0].pattern, Pattern::Any);
        assert_eq!(
            conds[1].pattern,
            Pattern::NoneOf(vec!["book".into(), "dvd".into()])
        );
    }

    #[test]
    fn priority_dialects() {
        let text = "priority: number-of-criteria, criterium(g, m, a, b, c, s, t), first-line\nfallback-policy: l a r b n c o d i e\n";
        let rules = compile(text).unwrap();
        assert_eq!(rules.priority().dimensions()[0], Dimension::PatronGroup);
        assert_eq!(rules.priority().tie_break(), LineTieBreak::FirstLine);
    }

    #[test]
    fn digest_tracks_source_bytes() {
        let a = compile(HEADER).unwrap();
        let b = compile(HEADER).unwrap();
        let c = compile(&with_header("# comment\n")).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn missing_priority() {
        let err = compile("fallback-policy: l a r b n c o d i e\n").unwrap_err();
        assert!(matches!(err, CompileError::InvalidPriorityDirective { line: 1, .. }));
    }

    #[test]
    fn empty_text() {
        assert!(matches!(
            compile("\n\n# nothing\n"),
            Err(CompileError::InvalidPriorityDirective { .. })
        ));
    }

    #[test]
    fn incomplete_priority() {
        let text = "priority: t, s, c, b, a, m\nfallback-policy: l a r b n c o d i e\n";
        match compile(text).unwrap_err() {
            CompileError::InvalidPriorityDirective { reason, .. } => {
                assert!(reason.contains("'g'"));
            }
            other => panic!("expected InvalidPriorityDirective, got {other:?}"),
        }
    }

    #[test]
    fn repeated_priority_code() {
        let text = "priority: t, t, c, b, a, m, g\nfallback-policy: l a r b n c o d i e\n";
        let err = compile(text).unwrap_err();
        assert!(matches!(err, CompileError::InvalidPriorityDirective { .. }));
    }

    #[test]
    fn second_priority_directive() {
        let err = compile(&with_header("priority: t, s, c, b, a, m, g\n")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidPriorityDirective { line: 3, .. }));
    }

    #[test]
    fn missing_fallback() {
        let err = compile("priority: t, s, c, b, a, m, g\nm book: l lp\n").unwrap_err();
        assert_eq!(err, CompileError::MissingFallback);
    }

    #[test]
    fn duplicate_fallback() {
        let err = compile(&with_header("fallback-policy: l a r b n c o d i e\n")).unwrap_err();
        assert_eq!(err, CompileError::DuplicateFallback { line: 3, first: 2 });
    }

    #[test]
    fn incomplete_fallback() {
        let text = "priority: t, s, c, b, a, m, g\nfallback-policy: l a r b n c o d\n";
        let err = compile(text).unwrap_err();
        assert_eq!(
            err,
            CompileError::IncompleteFallback {
                line: 2,
                kind: PolicyKind::LostItemFee
            }
        );
    }

    #[test]
    fn duplicate_condition_on_one_line() {
        let err = compile(&with_header("m book + m dvd: l x\n")).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateCondition {
                line: 3,
                dimension: Dimension::MaterialType
            }
        );
    }

    #[test]
    fn duplicate_condition_through_nesting() {
        let err = compile(&with_header("m book: l x\n    g staff + m dvd: l y\n")).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateCondition {
                line: 4,
                dimension: Dimension::MaterialType
            }
        );
    }

    #[test]
    fn unknown_dimension_letter() {
        let err = compile(&with_header("x book: l lp\n")).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownToken {
                line: 3,
                token: "x".into()
            }
        );
    }

    #[test]
    fn unknown_policy_letter() {
        let err = compile(&with_header("m book: q lp\n")).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownToken {
                line: 3,
                token: "q".into()
            }
        );
    }

    #[test]
    fn negated_wildcard_rejected() {
        let err = compile(&with_header("m !*: l lp\n")).unwrap_err();
        assert!(matches!(err, CompileError::UnknownToken { token, .. } if token == "!*"));
    }

    #[test]
    fn duplicate_policy_on_one_line() {
        let err = compile(&with_header("m book: l a l b\n")).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicatePolicy {
                line: 3,
                kind: PolicyKind::Loan
            }
        );
    }

    #[test]
    fn indented_line_without_ancestor() {
        let err = compile(&with_header("    m book: l lp\n")).unwrap_err();
        assert_eq!(err, CompileError::BadIndentation { line: 3 });
    }

    #[test]
    fn tab_indentation_rejected() {
        let err = compile(&with_header("m book: l a\n\tg staff: l b\n")).unwrap_err();
        assert_eq!(err, CompileError::BadIndentation { line: 4 });
    }

    #[test]
    fn indented_fallback_rejected() {
        let text = "priority: t, s, c, b, a, m, g\nm book: l a\n    fallback-policy: l a r b n c o d i e\n";
        assert_eq!(compile(text).unwrap_err(), CompileError::BadIndentation { line: 3 });
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = compile(&with_header("m book l lp\n")).unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
        assert_eq!(err.line(), Some(3));
    }
}
