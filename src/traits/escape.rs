use crate::types::SqlValue;

/// The sole sanitization primitive between application values and SQL text.
///
/// The formatter only ever passes normalized, non-null scalars: `Text`,
/// `Int32`, `Int64` or `Float`. Booleans arrive as `Int32` 0/1 and timestamps
/// as formatted `Text`.
pub trait Escape: Send + Sync {
    fn escape(&self, value: &SqlValue) -> String;
}

impl<F> Escape for F
where
    F: Fn(&SqlValue) -> String + Send + Sync,
{
    fn escape(&self, value: &SqlValue) -> String {
        self(value)
    }
}
