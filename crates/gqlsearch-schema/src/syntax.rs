//! Parser error reporting.

use async_graphql_parser::Error;
use gqlsearch_core::SchemaError;

/// One-line summary of a parser error.
///
/// Syntax errors carry a multi-line excerpt; only the `= expected ...`
/// line is kept.
#[must_use]
pub fn error_summary(err: &Error) -> String {
    let text = err.to_string();
    let mut lines = text.lines().map(str::trim);
    if let Some(expected) = lines.clone().find_map(|line| line.strip_prefix("= ")) {
        return expected.to_string();
    }
    lines
        .find(|line| !line.is_empty())
        .unwrap_or("syntax error")
        .to_string()
}

/// Line of the first position the parser reported, or 0.
#[must_use]
pub fn error_line(err: &Error) -> usize {
    err.positions().next().map_or(0, |pos| pos.line)
}

/// Convert a parser error into a [`SchemaError`].
#[must_use]
pub fn schema_error(err: &Error) -> SchemaError {
    SchemaError::Parse {
        line: error_line(err),
        message: error_summary(err),
    }
}
