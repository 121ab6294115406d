//! Placeholder substitution.
//!
//! Templates use `:name` for named values and `:?` for positional ones.
//! Every scalar goes through the injected [`Escape`] capability; nothing
//! else writes caller data into the SQL text.
//!
//! # Positional placeholders
//!
//! How `:?` consumes a positional list depends on how many `:?` tokens the
//! template holds:
//!
//! - exactly one: the whole list is rendered as one unit, a single tuple for
//!   a flat list or a run of tuples for a list of lists;
//! - two or more: each token takes the next element and renders it alone.
//!
//! So `:?` with `[["a", "b"], ["c", "d"]]` and `:?, :?` with the same list
//! both produce `('a', 'b'), ('c', 'd')`, while `(:?, :?)` with `["a", "b"]`
//! produces `('a', 'b')`.
//!
//! When the values are a mapping of scalars (or a mixed mapping), `:?`
//! renders an equality filter: `ph1 IS NULL AND ph2 = 'b'`.

mod classify;
mod escape;

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::FormatError;
use crate::traits::Escape;
use crate::types::{SqlValue, Value, Values};

pub use self::classify::{classify, classify_list, classify_map, classify_value, Classified, Shape};
pub use self::escape::{escape_scalar, Escaped, LiteralEscaper};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(\?|[A-Za-z0-9_]+)").expect("placeholder pattern is valid")
});

const POSITIONAL: &str = "?";

/// Query formatter bound to one escape capability.
#[derive(Clone)]
pub struct QueryFormat {
    escape: Arc<dyn Escape>,
}

impl QueryFormat {
    pub fn new(escape: Arc<dyn Escape>) -> Self {
        Self { escape }
    }

    /// Substitutes `values` into `query`. Without values the query is returned
    /// unchanged.
    pub fn query_format(&self, query: &str, values: Option<&Values>) -> Result<String, FormatError> {
        if query.is_empty() {
            return Err(FormatError::EmptyTemplate);
        }
        match values {
            Some(values) => substitute(query, values, self.escape.as_ref()),
            None => Ok(query.to_string()),
        }
    }

    pub fn escaper(&self) -> &Arc<dyn Escape> {
        &self.escape
    }
}

impl std::fmt::Debug for QueryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFormat").finish_non_exhaustive()
    }
}

/// Replaces every placeholder of `template` with escaped literal text.
pub fn substitute(template: &str, values: &Values, escape: &dyn Escape) -> Result<String, FormatError> {
    if template.is_empty() {
        return Err(FormatError::EmptyTemplate);
    }

    let tokens: Vec<_> = PLACEHOLDER.find_iter(template).collect();
    if tokens.is_empty() {
        return Err(FormatError::NoPlaceholderInTemplate);
    }

    let positional = tokens
        .iter()
        .filter(|m| &m.as_str()[1..] == POSITIONAL)
        .count();
    let mut replacer = Replacer::new(values, positional, escape)?;

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for token in tokens {
        out.push_str(&template[last..token.start()]);
        out.push_str(&replacer.replace(token.as_str())?);
        last = token.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Renders a classified value as SQL text.
pub fn render(value: &Classified<'_>, escape: &dyn Escape) -> String {
    map_escape(value, escape).join_use_parenthesis()
}

fn map_escape(value: &Classified<'_>, escape: &dyn Escape) -> Escaped {
    let esc = |v: &&SqlValue| escape_scalar(v, escape);
    match value {
        Classified::Scalar(v) => Escaped::Literal(escape_scalar(v, escape)),
        Classified::ScalarList(items) => Escaped::Tuple(items.iter().map(esc).collect()),
        Classified::ScalarMatrix(rows) => {
            Escaped::Tuples(rows.iter().map(|row| row.iter().map(esc).collect()).collect())
        }
    }
}

enum Bound<'a> {
    Positional {
        all: &'a [Value],
        cursor: VecDeque<&'a Value>,
    },
    Named {
        shape: Shape,
        entries: Vec<(&'a str, Classified<'a>)>,
    },
}

/// Per-call substitution state. Owns the positional cursor.
struct Replacer<'a> {
    bound: Bound<'a>,
    positional: usize,
    escape: &'a dyn Escape,
}

impl<'a> Replacer<'a> {
    fn new(values: &'a Values, positional: usize, escape: &'a dyn Escape) -> Result<Self, FormatError> {
        let bound = match values {
            Values::List(items) => {
                if items.is_empty() {
                    return Err(FormatError::invalid_shape(POSITIONAL, "Cannot pass empty arrays as values"));
                }
                Bound::Positional {
                    all: items,
                    cursor: items.iter().collect(),
                }
            }
            Values::Map(map) => {
                let (shape, entries) = classify_map(map)?;
                Bound::Named { shape, entries }
            }
        };
        Ok(Self {
            bound,
            positional,
            escape,
        })
    }

    fn replace(&mut self, token: &str) -> Result<String, FormatError> {
        let key = &token[1..];
        if key == POSITIONAL {
            self.replace_positional(token)
        } else {
            self.replace_named(token, key)
        }
    }

    fn replace_positional(&mut self, token: &str) -> Result<String, FormatError> {
        let escape = self.escape;
        match &mut self.bound {
            Bound::Named { shape, entries } => match shape {
                Shape::ScalarMap | Shape::MixedMap => Ok(entries
                    .iter()
                    .map(|(key, value)| match value {
                        Classified::Scalar(SqlValue::Null) => format!("{} IS NULL", key),
                        other => format!("{} = {}", key, render(other, escape)),
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ")),
                _ => Err(FormatError::ValuesKindMismatch {
                    placeholder: token.to_string(),
                    expected: "a sequence or a mapping of scalars",
                }),
            },
            Bound::Positional { all, cursor } => {
                let all: &'a [Value] = *all;
                if self.positional == 1 {
                    // a single :? takes the whole list, never one element
                    cursor.clear();
                    let classified = classify_list(all, token)?;
                    return Ok(render(&classified, escape));
                }
                let next = cursor.pop_front().ok_or(FormatError::ExhaustedPositional {
                    needed: self.positional,
                    supplied: all.len(),
                })?;
                let position = all.len() - cursor.len();
                let classified = classify_value(next, &format!("{}#{}", token, position))?;
                Ok(render(&classified, escape))
            }
        }
    }

    fn replace_named(&self, token: &str, key: &str) -> Result<String, FormatError> {
        match &self.bound {
            Bound::Named { entries, .. } => {
                entries
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, value)| render(value, self.escape))
                    .ok_or_else(|| FormatError::MissingPlaceholder {
                        placeholder: token.to_string(),
                        available: entries.iter().map(|(k, _)| k.to_string()).collect(),
                    })
            }
            Bound::Positional { .. } => Err(FormatError::ValuesKindMismatch {
                placeholder: token.to_string(),
                expected: "a mapping",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::types::ValueMap;

    /// Quotes everything, the way the tests expect literals to look.
    fn fake_escape(v: &SqlValue) -> String {
        match v {
            SqlValue::Text(s) => format!("'{}'", s),
            SqlValue::Int32(i) => format!("'{}'", i),
            SqlValue::Int64(i) => format!("'{}'", i),
            SqlValue::Float(f) => format!("'{}'", f),
            other => panic!("escaper received unnormalized value {:?}", other),
        }
    }

    fn fmt(template: &str, values: Values) -> Result<String, FormatError> {
        substitute(template, &values, &fake_escape)
    }

    #[test]
    fn test_named_scalars() {
        let values = Values::map([("ph1", "a"), ("ph2", "b")]);
        assert_eq!(fmt(":ph1, :ph2", values.clone()).unwrap(), "'a', 'b'");
        assert_eq!(fmt("(:ph1, :ph2)", values).unwrap(), "('a', 'b')");
    }

    #[test]
    fn test_several_positional_take_one_each() {
        assert_eq!(fmt(":?, :?", Values::list(["a", "b"])).unwrap(), "'a', 'b'");
        assert_eq!(fmt("(:?, :?)", Values::list(["a", "b"])).unwrap(), "('a', 'b')");
    }

    #[test]
    fn test_named_list_renders_tuple() {
        let values = Values::map([("ph1", Value::list(["a", "b"]))]);
        assert_eq!(fmt(":ph1", values).unwrap(), "('a', 'b')");

        let values = Values::map([("ph1", Value::list(["a", "b"])), ("ph2", Value::list(["c", "d"]))]);
        assert_eq!(fmt(":ph1, :ph2", values).unwrap(), "('a', 'b'), ('c', 'd')");
    }

    #[test]
    fn test_single_positional_takes_whole_list() {
        let one_row = Values::list([Value::list(["a", "b"])]);
        assert_eq!(fmt(":?", one_row).unwrap(), "('a', 'b')");

        let two_rows = Values::list([Value::list(["a", "b"]), Value::list(["c", "d"])]);
        assert_eq!(fmt(":?", two_rows).unwrap(), "('a', 'b'), ('c', 'd')");

        let flat = Values::list(["a", "b", "c"]);
        assert_eq!(fmt("IN :?", flat).unwrap(), "IN ('a', 'b', 'c')");
    }

    #[test]
    fn test_two_positional_over_rows() {
        let two_rows = Values::list([Value::list(["a", "b"]), Value::list(["c", "d"])]);
        assert_eq!(fmt(":?, :?", two_rows).unwrap(), "('a', 'b'), ('c', 'd')");
    }

    #[test]
    fn test_named_matrix() {
        let values = Values::map([("ph1", Value::list([Value::list(["a", "b"]), Value::list(["c", "d"])]))]);
        assert_eq!(fmt(":ph1", values).unwrap(), "('a', 'b'), ('c', 'd')");
    }

    #[test]
    fn test_positional_with_scalar_map_renders_filter() {
        let values = Values::map([("ph1", "a"), ("ph2", "b")]);
        assert_eq!(fmt(":?", values).unwrap(), "ph1 = 'a' AND ph2 = 'b'");

        let values = Values::map([("ph1", Value::null()), ("ph2", Value::from("b"))]);
        assert_eq!(fmt(":?", values).unwrap(), "ph1 IS NULL AND ph2 = 'b'");
    }

    #[test]
    fn test_positional_with_mixed_map_renders_lists_by_shape() {
        let values = Values::map([("ph1", Value::list(["a", "b"])), ("ph2", Value::from("c"))]);
        assert_eq!(fmt(":?", values).unwrap(), "ph1 = ('a', 'b') AND ph2 = 'c'");
    }

    #[test]
    fn test_filter_applies_to_every_positional_token() {
        let values = Values::map([("id", 3)]);
        assert_eq!(
            fmt("WHERE :? OR :?", values).unwrap(),
            "WHERE id = '3' OR id = '3'"
        );
    }

    #[test]
    fn test_mixed_named_values() {
        let values = Values::map([("ph1", Value::list(["a", "b"])), ("ph2", Value::from("c"))]);
        assert_eq!(fmt(":ph1 AND :ph2", values).unwrap(), "('a', 'b') AND 'c'");

        let values = Values::map([("ph1", Value::list([Value::null(), Value::from("b")])), ("ph2", Value::from("c"))]);
        assert_eq!(fmt(":ph1 AND :ph2", values).unwrap(), "(NULL, 'b') AND 'c'");
    }

    #[test]
    fn test_rows_with_dates_booleans_and_numbers() {
        let date1 = Utc.with_ymd_and_hms(2020, 3, 1, 9, 40, 16).unwrap();
        let date2 = Utc.with_ymd_and_hms(2020, 4, 1, 9, 40, 16).unwrap();
        let values = Values::list([
            Value::list([Value::from("a"), Value::from("b"), Value::from(false), Value::from(date1)]),
            Value::list([Value::from("c"), Value::from("d"), Value::from(1), Value::from(date2)]),
        ]);
        assert_eq!(
            fmt(":?", values).unwrap(),
            "('a', 'b', '0', '2020-03-01 09:40:16'), ('c', 'd', '1', '2020-04-01 09:40:16')"
        );

        let values = Values::list([
            Value::list([Value::from("a"), Value::from("b"), Value::null(), Value::from(4)]),
            Value::list([Value::from("c"), Value::from("d"), Value::from("e"), Value::from(33)]),
        ]);
        assert_eq!(fmt(":?", values).unwrap(), "('a', 'b', NULL, '4'), ('c', 'd', 'e', '33')");
    }

    #[test]
    fn test_positional_elements_recurse_by_shape() {
        let values = Values::list([Value::from("x"), Value::list([1, 2])]);
        assert_eq!(
            fmt("SELECT * FROM t WHERE a = :? AND b IN :?", values).unwrap(),
            "SELECT * FROM t WHERE a = 'x' AND b IN ('1', '2')"
        );
    }

    #[test]
    fn test_empty_template_fails() {
        assert_eq!(fmt("", Values::list(["a"])), Err(FormatError::EmptyTemplate));
        let qf = QueryFormat::new(Arc::new(fake_escape));
        assert_eq!(qf.query_format("", None), Err(FormatError::EmptyTemplate));
    }

    #[test]
    fn test_template_without_placeholder_fails() {
        assert_eq!(
            fmt("SELECT 1", Values::list(["a"])),
            Err(FormatError::NoPlaceholderInTemplate)
        );
    }

    #[test]
    fn test_query_format_without_values_is_identity() {
        let qf = QueryFormat::new(Arc::new(LiteralEscaper));
        assert_eq!(qf.query_format("SELECT 1", None).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_missing_named_value_lists_keys() {
        let values = Values::map([("ph1", "a"), ("ph2", "b")]);
        match fmt(":ph1 :ph3", values) {
            Err(FormatError::MissingPlaceholder { placeholder, available }) => {
                assert_eq!(placeholder, ":ph3");
                assert_eq!(available, vec!["ph1".to_string(), "ph2".to_string()]);
            }
            other => panic!("Expected MissingPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_more_positional_than_values() {
        assert_eq!(
            fmt(":?, :?, :?", Values::list(["a", "b"])),
            Err(FormatError::ExhaustedPositional { needed: 3, supplied: 2 })
        );
    }

    #[test]
    fn test_empty_sequences_fail() {
        assert!(matches!(
            fmt(":?", Values::List(vec![])),
            Err(FormatError::InvalidShape { .. })
        ));
        assert!(matches!(
            fmt(":ph1", Values::map([("ph1", Value::List(vec![]))])),
            Err(FormatError::InvalidShape { .. })
        ));
        assert!(matches!(
            fmt(":?, :?", Values::list([Value::from(1), Value::List(vec![])])),
            Err(FormatError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_three_levels_fail() {
        let deep = Value::list([Value::list([Value::list(["a"])])]);
        assert!(matches!(
            fmt(":ph1", Values::map([("ph1", deep.clone())])),
            Err(FormatError::InvalidShape { .. })
        ));
        assert!(matches!(
            fmt(":?", Values::List(vec![deep])),
            Err(FormatError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_values_kind_mismatches() {
        assert!(matches!(
            fmt(":name", Values::list(["a"])),
            Err(FormatError::ValuesKindMismatch { expected: "a mapping", .. })
        ));
        let list_map = Values::map([("ph1", Value::list(["a"]))]);
        assert!(matches!(
            fmt(":?", list_map),
            Err(FormatError::ValuesKindMismatch { .. })
        ));
    }

    #[test]
    fn test_injection_is_escaped() {
        let values = Values::map([("name", "x'; DROP TABLE users; --")]);
        let sql = substitute("SELECT * FROM users WHERE name = :name", &values, &LiteralEscaper).unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE name = 'x''; DROP TABLE users; --'");
    }

    #[test]
    fn test_key_order_is_preserved_in_filter() {
        let map: ValueMap = [("z", 1), ("a", 2), ("m", 3)].into_iter().collect();
        let sql = substitute(":?", &Values::Map(map), &LiteralEscaper).unwrap();
        assert_eq!(sql, "z = 1 AND a = 2 AND m = 3");
    }

    #[test]
    fn test_flat_list_single_positional_keeps_order() {
        let items: Vec<i64> = (1..=20).rev().collect();
        let expected = format!(
            "({})",
            items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
        );
        let sql = substitute(":?", &Values::list(items), &LiteralEscaper).unwrap();
        assert_eq!(sql, expected);
    }
}
