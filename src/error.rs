use thiserror::Error;

/// Errors raised while substituting values into a query template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("A query must be provided")]
    EmptyTemplate,

    #[error("Query does not contain any placeholder")]
    NoPlaceholderInTemplate,

    #[error("Provided named ref '{placeholder}' without corresponding value, keys are: {}", .available.join(", "))]
    MissingPlaceholder {
        placeholder: String,
        available: Vec<String>,
    },

    #[error("More question marks than elements: {needed} needed, {supplied} supplied")]
    ExhaustedPositional { needed: usize, supplied: usize },

    #[error("Unsupported value for ref {reference}: {reason}")]
    InvalidShape { reference: String, reason: String },

    #[error("Placeholder {placeholder} requires values to be {expected}")]
    ValuesKindMismatch {
        placeholder: String,
        expected: &'static str,
    },
}

impl FormatError {
    pub(crate) fn invalid_shape(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        FormatError::InvalidShape {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Failures surfaced by a driver's connect, end or query call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Disconnect failed: {0}")]
    EndFailed(String),

    #[error("Driver connection is not established")]
    NotConnected,
}

/// Error type for sqlreq operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReqError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Missing database connection config props: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Cannot change connection config while there is a connection, remove the connection first")]
    ConfigImmutable,

    #[error("Connection invariant violated: {0}")]
    ConnectionInvariant(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for sqlreq operations
pub type Result<T> = std::result::Result<T, ReqError>;
