//! Shape classification of placeholder values.
//!
//! Classification is pure: it borrows the value, never mutates it, and
//! yields the same answer every time. Values come out as [`Classified`] views
//! so the formatter can match on them without probing types again.

use crate::error::FormatError;
use crate::types::{SqlValue, Value, ValueMap, Values};

const EMPTY_LIST: &str = "Cannot pass empty arrays as values";
const TOO_DEEP: &str =
    "Supplied value has too many depth levels, max supported is 2 for INSERT VALUES :ref or 1 for IN (:ref)";
const MIXED_LIST: &str = "Arrays must hold either only scalars or only arrays of scalars";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    ScalarList,
    ScalarMatrix,
    ScalarMap,
    ScalarListMap,
    ScalarMatrixMap,
    MixedMap,
}

/// A single value after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'a> {
    Scalar(&'a SqlValue),
    ScalarList(Vec<&'a SqlValue>),
    ScalarMatrix(Vec<Vec<&'a SqlValue>>),
}

impl Classified<'_> {
    pub fn shape(&self) -> Shape {
        match self {
            Classified::Scalar(_) => Shape::Scalar,
            Classified::ScalarList(_) => Shape::ScalarList,
            Classified::ScalarMatrix(_) => Shape::ScalarMatrix,
        }
    }
}

/// Classifies a single value. `reference` names the value in error messages.
pub fn classify_value<'a>(value: &'a Value, reference: &str) -> Result<Classified<'a>, FormatError> {
    match value {
        Value::Scalar(s) => Ok(Classified::Scalar(s)),
        Value::List(items) => classify_list(items, reference),
    }
}

/// Classifies a sequence of values as a flat list or a matrix.
pub fn classify_list<'a>(items: &'a [Value], reference: &str) -> Result<Classified<'a>, FormatError> {
    if items.is_empty() {
        return Err(FormatError::invalid_shape(reference, EMPTY_LIST));
    }

    if let Some(flat) = scalars(items) {
        return Ok(Classified::ScalarList(flat));
    }

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::List(inner) = item else {
            return Err(FormatError::invalid_shape(reference, MIXED_LIST));
        };
        if inner.is_empty() {
            return Err(FormatError::invalid_shape(reference, EMPTY_LIST));
        }
        match scalars(inner) {
            Some(row) => rows.push(row),
            None => return Err(FormatError::invalid_shape(reference, TOO_DEEP)),
        }
    }
    Ok(Classified::ScalarMatrix(rows))
}

/// Classifies every entry of a mapping, keeping key order.
pub fn classify_map<'a>(
    map: &'a ValueMap,
) -> Result<(Shape, Vec<(&'a str, Classified<'a>)>), FormatError> {
    let entries = map
        .iter()
        .map(|(key, value)| classify_value(value, key).map(|c| (key, c)))
        .collect::<Result<Vec<_>, _>>()?;

    let uniform = |shape: Shape| entries.iter().all(|(_, c)| c.shape() == shape);
    let shape = if uniform(Shape::Scalar) {
        Shape::ScalarMap
    } else if uniform(Shape::ScalarList) {
        Shape::ScalarListMap
    } else if uniform(Shape::ScalarMatrix) {
        Shape::ScalarMatrixMap
    } else {
        Shape::MixedMap
    };
    Ok((shape, entries))
}

/// Classifies top-level values into one of the seven shapes.
pub fn classify(values: &Values) -> Result<Shape, FormatError> {
    match values {
        Values::List(items) => classify_list(items, "?").map(|c| c.shape()),
        Values::Map(map) => classify_map(map).map(|(shape, _)| shape),
    }
}

fn scalars(items: &[Value]) -> Option<Vec<&SqlValue>> {
    items.iter().map(Value::as_scalar).collect()
}
