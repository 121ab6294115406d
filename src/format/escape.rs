//! Scalar escaping and tuple grouping.

use crate::traits::Escape;
use crate::types::SqlValue;

/// SQL-standard literal escaper.
///
/// Text is single-quoted with embedded quotes doubled. Numbers are emitted
/// bare, except non-finite floats which only exist as quoted literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEscaper;

impl LiteralEscaper {
    pub fn quote(text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('\'');
        for c in text.chars() {
            if c == '\'' {
                out.push('\'');
            }
            out.push(c);
        }
        out.push('\'');
        out
    }

    /// Reverses [`LiteralEscaper::quote`]. Returns `None` for text that is not a
    /// well-formed quoted literal.
    pub fn unescape(literal: &str) -> Option<String> {
        let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\'' {
                // a lone quote inside the literal would have terminated it
                if chars.next() != Some('\'') {
                    return None;
                }
            }
            out.push(c);
        }
        Some(out)
    }
}

impl Escape for LiteralEscaper {
    fn escape(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(s) => Self::quote(s),
            SqlValue::Int32(i) => i.to_string(),
            SqlValue::Int64(i) => i.to_string(),
            SqlValue::Float(f) if f.is_nan() => Self::quote("NaN"),
            SqlValue::Float(f) if f.is_infinite() => {
                Self::quote(if *f > 0.0 { "Infinity" } else { "-Infinity" })
            }
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Bool(b) => (*b as i32).to_string(),
            SqlValue::Timestamp(ts) => Self::quote(&SqlValue::to_sql_datetime(ts)),
        }
    }
}

/// Escapes one scalar. `NULL` never reaches the escape capability.
pub fn escape_scalar(value: &SqlValue, escape: &dyn Escape) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => escape.escape(&SqlValue::Int32(i32::from(*b))),
        SqlValue::Timestamp(ts) => escape.escape(&SqlValue::Text(SqlValue::to_sql_datetime(ts))),
        other => escape.escape(other),
    }
}

/// A value escaped element-wise, not yet grouped into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Escaped {
    Literal(String),
    Tuple(Vec<String>),
    Tuples(Vec<Vec<String>>),
}

impl Escaped {
    /// Wraps a tuple as `(a, b)`. Tuples of a matrix are each wrapped and then
    /// joined as `(a, b), (c, d)` without an outer pair.
    pub fn join_use_parenthesis(&self) -> String {
        match self {
            Escaped::Literal(s) => s.clone(),
            Escaped::Tuple(items) => parenthesize(items),
            Escaped::Tuples(rows) => rows
                .iter()
                .map(|row| parenthesize(row))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn parenthesize(items: &[String]) -> String {
    format!("({})", items.join(", "))
}
