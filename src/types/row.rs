use std::collections::HashMap;

use crate::error::{ReqError, Result};

/// Driver-agnostic raw result from a database query.
/// All non-null values are converted to strings by the driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of nullable string values in column order
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows touched by a data-modifying statement
    pub rows_affected: u64,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A result for a statement that returns no rows.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }
}

/// A single row result from a query.
/// Values are stored as strings and accessed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    values: HashMap<String, Option<String>>,
}

impl Row {
    pub(crate) fn new(columns: &[String], values: Vec<Option<String>>) -> Self {
        let values = columns.iter().cloned().zip(values).collect();
        Self { values }
    }

    /// Gets a value by column name. SQL `NULL` is `None`.
    pub fn get(&self, column: &str) -> Result<Option<&str>> {
        self.values
            .get(column)
            .map(|v| v.as_deref())
            .ok_or_else(|| ReqError::ColumnNotFound(column.to_string()))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of a query execution, containing zero or more rows.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
    rows_affected: u64,
}

impl QueryResult {
    /// Creates a QueryResult from a RawQueryResult.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        let rows = raw
            .rows
            .into_iter()
            .map(|values| Row::new(&raw.columns, values))
            .collect();
        Self {
            columns: raw.columns,
            rows,
            rows_affected: raw.rows_affected,
        }
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.rows.len() != 1 {
            return Err(ReqError::UnexpectedRowCount {
                expected: 1,
                actual: self.rows.len(),
            });
        }
        self.rows
            .into_iter()
            .next()
            .ok_or(ReqError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            })
    }

    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_row_get() {
        let columns = vec!["id".to_string(), "name".to_string(), "note".to_string()];
        let row = Row::new(&columns, vec![cell("1"), cell("John"), None]);

        assert_eq!(row.get("id").unwrap(), Some("1"));
        assert_eq!(row.get("name").unwrap(), Some("John"));
        assert_eq!(row.get("note").unwrap(), None);
        assert!(matches!(
            row.get("missing"),
            Err(ReqError::ColumnNotFound(c)) if c == "missing"
        ));
    }

    #[test]
    fn test_query_result_single_row() {
        let raw = RawQueryResult::new(vec!["id".to_string()], vec![vec![cell("1")]]);
        let row = QueryResult::from_raw(raw).single_row().unwrap();
        assert_eq!(row.get("id").unwrap(), Some("1"));
    }

    #[test]
    fn test_query_result_single_row_error_on_empty() {
        let raw = RawQueryResult::new(vec!["id".to_string()], vec![]);
        let err = QueryResult::from_raw(raw).single_row().unwrap_err();
        assert_eq!(
            err,
            ReqError::UnexpectedRowCount {
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_query_result_single_row_error_on_multiple() {
        let raw = RawQueryResult::new(
            vec!["id".to_string()],
            vec![vec![cell("1")], vec![cell("2")]],
        );
        let err = QueryResult::from_raw(raw).single_row().unwrap_err();
        assert_eq!(
            err,
            ReqError::UnexpectedRowCount {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_affected_result_has_no_rows() {
        let result = QueryResult::from_raw(RawQueryResult::affected(3));
        assert!(result.is_empty());
        assert_eq!(result.rows_affected(), 3);
    }
}
