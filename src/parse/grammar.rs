use winnow::ascii::{space0, space1, till_line_ending};
use winnow::combinator::{alt, cut_err, eof, opt, preceded, repeat, separated, terminated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{rest, take_while};

use super::parser::{Assignment, Criterion, PriorityItem, Statement};

// -- Whitespace & comments --------------------------------------------------

fn trailing(input: &mut &str) -> ModalResult<()> {
    (space0, opt(('#', till_line_ending))).void().parse_next(input)
}

// -- Words ------------------------------------------------------------------

/// Letters, identifiers and keywords: anything up to whitespace or a
/// punctuation character the grammar gives meaning to.
fn word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, ':' | '+' | ',' | '#' | '(' | ')' | '!')
    })
    .parse_next(input)
}

fn list_separator(input: &mut &str) -> ModalResult<()> {
    (space0, ',', space0).void().parse_next(input)
}

// -- Policy assignments -----------------------------------------------------

fn assignment(input: &mut &str) -> ModalResult<Assignment> {
    (word, space1, word)
        .map(|(letter, _, id): (&str, &str, &str)| Assignment {
            letter: letter.to_owned(),
            id: id.to_owned(),
        })
        .parse_next(input)
}

fn assignments(input: &mut &str) -> ModalResult<Vec<Assignment>> {
    repeat(0.., preceded(space0, assignment)).parse_next(input)
}

// -- Priority directive -----------------------------------------------------

fn criterium_group(input: &mut &str) -> ModalResult<PriorityItem> {
    ("criterium", space0, '(', space0).parse_next(input)?;
    let codes: Vec<&str> = separated(1.., word, list_separator).parse_next(input)?;
    (space0, ')').parse_next(input)?;
    Ok(PriorityItem::Criterium(
        codes.into_iter().map(str::to_owned).collect(),
    ))
}

fn priority_item(input: &mut &str) -> ModalResult<PriorityItem> {
    alt((
        criterium_group,
        word.map(|w: &str| PriorityItem::Word(w.to_owned())),
    ))
    .parse_next(input)
}

fn priority_list(input: &mut &str) -> ModalResult<Vec<PriorityItem>> {
    separated(0.., priority_item, list_separator).parse_next(input)
}

/// A directive whose list cannot be read is still recognised as a directive,
/// so the compiler can report it as one.
fn priority_directive(input: &mut &str) -> ModalResult<Statement> {
    ("priority", space0, ':', space0).parse_next(input)?;
    alt((
        terminated(priority_list, (trailing, eof)).map(Statement::Priority),
        rest.map(|raw: &str| Statement::MalformedPriority(raw.trim().to_owned())),
    ))
    .parse_next(input)
}

// -- Fallback ---------------------------------------------------------------

fn fallback_line(input: &mut &str) -> ModalResult<Statement> {
    ("fallback-policy", space0, ':').parse_next(input)?;
    assignments.map(Statement::Fallback).parse_next(input)
}

// -- Condition lines --------------------------------------------------------

fn criterion(input: &mut &str) -> ModalResult<Criterion> {
    let letter = word.parse_next(input)?;
    space1.parse_next(input)?;
    let negated = opt('!').parse_next(input)?.is_some();
    let values: Vec<&str> = separated(1.., word, space1)
        .context(StrContext::Expected(StrContextValue::Description("value")))
        .parse_next(input)?;
    Ok(Criterion {
        letter: letter.to_owned(),
        negated,
        values: values.into_iter().map(str::to_owned).collect(),
    })
}

fn rule_line(input: &mut &str) -> ModalResult<Statement> {
    let criteria: Vec<Criterion> =
        separated(1.., criterion, (space0, '+', space0)).parse_next(input)?;
    space0.parse_next(input)?;
    cut_err(':')
        .context(StrContext::Expected(StrContextValue::CharLiteral(':')))
        .parse_next(input)?;
    let assignments = assignments.parse_next(input)?;
    Ok(Statement::Rule {
        criteria,
        assignments,
    })
}

// -- Top-level --------------------------------------------------------------

/// One non-blank, non-comment line with its indentation already removed.
pub fn statement(input: &mut &str) -> ModalResult<Statement> {
    let stmt = alt((priority_directive, fallback_line, rule_line))
        .context(StrContext::Expected(StrContextValue::Description(
            "priority directive, fallback-policy or condition line",
        )))
        .parse_next(input)?;
    trailing.parse_next(input)?;
    Ok(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(line: &str) -> Statement {
        statement.parse(line).unwrap()
    }

    fn assign(letter: &str, id: &str) -> Assignment {
        Assignment {
            letter: letter.into(),
            id: id.into(),
        }
    }

    #[test]
    fn priority_codes() {
        let stmt = parse_one("priority: t, s, c, b, a, m, g");
        let Statement::Priority(items) = stmt else {
            panic!("expected priority, got {stmt:?}");
        };
        assert_eq!(items.len(), 7);
        assert_eq!(items[0], PriorityItem::Word("t".into()));
        assert_eq!(items[6], PriorityItem::Word("g".into()));
    }

    #[test]
    fn priority_with_criterium_group() {
        let stmt = parse_one("priority: number-of-criteria, criterium(t, s, c, b, a, m, g), last-line");
        let Statement::Priority(items) = stmt else {
            panic!("expected priority, got {stmt:?}");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], PriorityItem::Word("number-of-criteria".into()));
        assert!(matches!(&items[1], PriorityItem::Criterium(codes) if codes.len() == 7));
        assert_eq!(items[2], PriorityItem::Word("last-line".into()));
    }

    #[test]
    fn unreadable_priority_is_still_a_directive() {
        let stmt = parse_one("priority: t s c");
        assert_eq!(stmt, Statement::MalformedPriority("t s c".into()));
    }

    #[test]
    fn empty_priority_list() {
        assert_eq!(parse_one("priority:"), Statement::Priority(vec![]));
    }

    #[test]
    fn fallback_assignments() {
        let stmt = parse_one("fallback-policy: l lp r rp n np o op i ip");
        assert_eq!(
            stmt,
            Statement::Fallback(vec![
                assign("l", "lp"),
                assign("r", "rp"),
                assign("n", "np"),
                assign("o", "op"),
                assign("i", "ip"),
            ])
        );
    }

    #[test]
    fn condition_with_attached_colon() {
        let stmt = parse_one("m book: l lp1");
        assert_eq!(
            stmt,
            Statement::Rule {
                criteria: vec![Criterion {
                    letter: "m".into(),
                    negated: false,
                    values: vec!["book".into()],
                }],
                assignments: vec![assign("l", "lp1")],
            }
        );
    }

    #[test]
    fn conjunction_of_conditions() {
        let stmt = parse_one("m book + t rare + g staff : l lp3 r rp1");
        let Statement::Rule {
            criteria,
            assignments,
        } = stmt
        else {
            panic!("expected rule line");
        };
        let letters: Vec<&str> = criteria.iter().map(|c| c.letter.as_str()).collect();
        assert_eq!(letters, vec!["m", "t", "g"]);
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn multiple_and_negated_values() {
        let stmt = parse_one("m !book dvd + g *: l x");
        let Statement::Rule { criteria, .. } = stmt else {
            panic!("expected rule line");
        };
        assert!(criteria[0].negated);
        assert_eq!(criteria[0].values, vec!["book", "dvd"]);
        assert!(!criteria[1].negated);
        assert_eq!(criteria[1].values, vec!["*"]);
    }

    #[test]
    fn narrowing_line_without_policies() {
        let stmt = parse_one("m book + t rare :");
        assert!(matches!(stmt, Statement::Rule { assignments, .. } if assignments.is_empty()));
    }

    #[test]
    fn trailing_comment_ignored() {
        let stmt = parse_one("m book: l lp1   # books only");
        assert!(matches!(stmt, Statement::Rule { assignments, .. } if assignments.len() == 1));
    }

    #[test]
    fn missing_colon_fails() {
        assert!(statement.parse("m book l lp1").is_err());
    }

    #[test]
    fn dangling_policy_letter_fails() {
        assert!(statement.parse("m book: l lp1 r").is_err());
    }

    #[test]
    fn condition_without_value_fails() {
        assert!(statement.parse("m: l lp1").is_err());
    }
}
