//! Pipe and stats-function AST produced by the parser.

use std::fmt;

use crate::lexer::is_token_char;

/// One stage of a query pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipe {
    /// Project the named columns.
    Fields(FieldsPipe),
    /// Group-by aggregation.
    Stats(StatsPipe),
    /// Keep the first `n` rows.
    Head(HeadPipe),
    /// Drop the first `n` rows.
    Skip(SkipPipe),
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipe::Fields(p) => p.fmt(f),
            Pipe::Stats(p) => p.fmt(f),
            Pipe::Head(p) => p.fmt(f),
            Pipe::Skip(p) => p.fmt(f),
        }
    }
}

/// `fields F1, F2, ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsPipe {
    /// Columns to keep, in output order. `*` keeps everything.
    pub fields: Vec<String>,
}

impl fmt::Display for FieldsPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fields {}", field_names_string(&self.fields))
    }
}

/// `head N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadPipe {
    /// Maximum number of rows to pass downstream.
    pub n: u64,
}

impl fmt::Display for HeadPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "head {}", self.n)
    }
}

/// `skip N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipPipe {
    /// Number of leading rows to drop.
    pub n: u64,
}

impl fmt::Display for SkipPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skip {}", self.n)
    }
}

/// `stats [by (F1, ...)] FUNC [, FUNC ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPipe {
    /// Group identity columns; empty means a single global group.
    pub by_fields: Vec<String>,
    /// Aggregations to evaluate per group. Never empty after parsing.
    pub funcs: Vec<StatsFunc>,
}

impl StatsPipe {
    /// Source columns this pipe reads: by-fields plus every function's needed
    /// fields, deduplicated in first-seen order. Lets a source prune reads.
    pub fn needed_fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for f in self.by_fields.iter().map(String::as_str) {
            if !out.contains(&f) {
                out.push(f);
            }
        }
        for func in &self.funcs {
            for f in func.needed_fields() {
                if !out.contains(&f) {
                    out.push(f);
                }
            }
        }
        out
    }
}

impl fmt::Display for StatsPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stats ")?;
        if !self.by_fields.is_empty() {
            write!(f, "by ({}) ", field_names_string(&self.by_fields))?;
        }
        for (i, func) in self.funcs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            func.fmt(f)?;
        }
        Ok(())
    }
}

/// A stats aggregation function. Closed set; dispatch is a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsFunc {
    /// `count(...)`: rows with at least one non-empty named field.
    Count(StatsCount),
    /// `uniq(...)`: exact distinct-value cardinality.
    Uniq(StatsUniq),
}

impl StatsFunc {
    /// Name of the output column this function produces.
    pub fn result_name(&self) -> &str {
        match self {
            StatsFunc::Count(sc) => &sc.result_name,
            StatsFunc::Uniq(su) => &su.result_name,
        }
    }

    /// Source columns required to evaluate this function.
    ///
    /// `count` drops `*` (a star counts rows regardless of any specific
    /// column); `uniq` reports its fields verbatim, `*` included, since a
    /// star enrolls every column present.
    pub fn needed_fields(&self) -> Vec<&str> {
        match self {
            StatsFunc::Count(sc) => sc
                .fields
                .iter()
                .map(String::as_str)
                .filter(|f| *f != "*")
                .collect(),
            StatsFunc::Uniq(su) => su.fields.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for StatsFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsFunc::Count(sc) => sc.fmt(f),
            StatsFunc::Uniq(su) => su.fmt(f),
        }
    }
}

/// Parsed `count(...)` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsCount {
    /// Argument fields; empty means count all rows.
    pub fields: Vec<String>,
    /// Output column name (`count` unless `as NAME` was given).
    pub result_name: String,
    /// Whether `fields` contains `*`.
    pub contains_star: bool,
}

impl fmt::Display for StatsCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count({}) as {}",
            field_names_string(&self.fields),
            quote_token_if_needed(&self.result_name)
        )
    }
}

/// Parsed `uniq(...)` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsUniq {
    /// Argument fields; never empty after parsing.
    pub fields: Vec<String>,
    /// Output column name (`uniq` unless `as NAME` was given).
    pub result_name: String,
    /// Whether `fields` contains `*`.
    pub contains_star: bool,
}

impl fmt::Display for StatsUniq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uniq({}) as {}",
            field_names_string(&self.fields),
            quote_token_if_needed(&self.result_name)
        )
    }
}

/// Render a field list in canonical comma-separated form.
pub(crate) fn field_names_string(fields: &[String]) -> String {
    let mut out = String::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if f == "*" {
            out.push('*');
        } else {
            out.push_str(&quote_token_if_needed(f));
        }
    }
    out
}

/// Quote a token when it would not survive re-lexing as a bare word.
pub(crate) fn quote_token_if_needed(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_token_char) {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
