mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::{Assignment, Criterion, ParsedRuleText, PriorityItem, SourceLine, Statement};

/// Split rule text into statements, dropping blank and comment lines.
///
/// A line whose first non-blank character is `#` or `/` is a comment. A
/// leading byte-order mark is skipped.
///
/// # Errors
///
/// Returns [`ParseError`] for the first line that is not valid rule syntax.
pub fn parse(input: &str) -> Result<ParsedRuleText, ParseError> {
    use winnow::Parser;

    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let number = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let body = raw.trim_start();
        if body.is_empty() || body.starts_with('#') || body.starts_with('/') {
            continue;
        }
        let indentation = &raw[..raw.len() - body.len()];
        let statement = grammar::statement.parse(body.trim_end()).map_err(|e| {
            let column = indentation.chars().count() + e.offset() + 1;
            let detail = e.inner().to_string();
            if detail.is_empty() {
                ParseError::new(number, format!("unexpected input at column {column}"))
            } else {
                ParseError::new(number, format!("{detail} at column {column}"))
            }
        })?;
        lines.push(SourceLine {
            number,
            indent: indentation.chars().count(),
            tabbed: indentation.contains('\t'),
            statement,
        });
    }
    Ok(ParsedRuleText { lines })
}
