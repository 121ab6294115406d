use crate::error::FormatError;
use crate::types::SqlValue;

/// A placeholder value: a scalar or an arbitrarily nested list of values.
/// Nesting is only checked when the value is classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(SqlValue),
    List(Vec<Value>),
}

impl Value {
    /// Builds a list value from anything convertible into values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn null() -> Self {
        Value::Scalar(SqlValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&SqlValue> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }
}

impl<T: Into<SqlValue>> From<T> for Value {
    fn from(value: T) -> Self {
        Value::Scalar(value.into())
    }
}

/// Insertion-ordered mapping of placeholder names to values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`ValueMap::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ValueMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Top-level values bound to a query template: a positional sequence or a
/// named mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    List(Vec<Value>),
    Map(ValueMap),
}

impl Values {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Values::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Values::Map(entries.into_iter().collect())
    }
}

impl From<ValueMap> for Values {
    fn from(map: ValueMap) -> Self {
        Values::Map(map)
    }
}

impl From<Vec<Value>> for Values {
    fn from(list: Vec<Value>) -> Self {
        Values::List(list)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = FormatError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;

        Ok(match json {
            Json::Null => Value::null(),
            Json::Bool(b) => Value::from(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if n.is_u64() {
                    // would lose precision as a float
                    return Err(FormatError::invalid_shape(
                        "json",
                        format!("integer {} does not fit in a signed 64-bit value", n),
                    ));
                } else {
                    Value::from(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::from(s),
            Json::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Json::Object(_) => {
                return Err(FormatError::invalid_shape(
                    "json",
                    "objects are only supported as top-level values",
                ))
            }
        })
    }
}

impl TryFrom<serde_json::Value> for Values {
    type Error = FormatError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Object(obj) => {
                let mut map = ValueMap::new();
                for (k, v) in obj {
                    map.insert(k, Value::try_from(v)?);
                }
                Ok(Values::Map(map))
            }
            serde_json::Value::Array(items) => Ok(Values::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(FormatError::invalid_shape(
                "json",
                "top-level values must be an array or an object",
            )),
        }
    }
}
