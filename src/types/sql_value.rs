use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used when a timestamp is rendered into SQL text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An atomic SQL-representable value.
/// Escapers receive these already normalized: booleans as `Int32` and
/// timestamps as `Text`, never `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Renders a timestamp truncated to the second, e.g. `2020-03-01 09:40:16`.
    pub fn to_sql_datetime(ts: &DateTime<Utc>) -> String {
        ts.format(DATETIME_FORMAT).to_string()
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value.and_utc())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_truncates_to_seconds() {
        let ts = Utc
            .with_ymd_and_hms(2020, 3, 1, 9, 40, 16)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(767))
            .unwrap();
        assert_eq!(SqlValue::to_sql_datetime(&ts), "2020-03-01 09:40:16");
    }

    #[test]
    fn test_option_none_is_null() {
        let v: SqlValue = Option::<&str>::None.into();
        assert!(v.is_null());
        let v: SqlValue = Some(7i64).into();
        assert_eq!(v, SqlValue::Int64(7));
    }
}
