/// The result of reading rule text line by line.
///
/// Blank and comment lines are already dropped; everything else is kept in
/// source order with its line number and indentation.
#[derive(Debug)]
pub struct ParsedRuleText {
    pub lines: Vec<SourceLine>,
}

#[derive(Debug)]
pub struct SourceLine {
    /// 1-based line number in the original text.
    pub number: u32,
    /// Width of the leading whitespace.
    pub indent: usize,
    /// Leading whitespace contained a tab.
    pub tabbed: bool,
    pub statement: Statement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Priority(Vec<PriorityItem>),
    /// `priority:` followed by text that is not a comma-separated list.
    MalformedPriority(String),
    Fallback(Vec<Assignment>),
    Rule {
        criteria: Vec<Criterion>,
        assignments: Vec<Assignment>,
    },
}

/// One comma-separated entry of a `priority:` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityItem {
    Word(String),
    /// `criterium(t, s, ...)`
    Criterium(Vec<String>),
}

/// `<letter> [!]<value> <value>...`, not yet checked against known letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub letter: String,
    pub negated: bool,
    pub values: Vec<String>,
}

/// `<letter> <policy id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub letter: String,
    pub id: String,
}
