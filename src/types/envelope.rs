use std::fmt;

use serde::Serialize;

use crate::config::ConnectionConfig;
use crate::error::ReqError;
use crate::traits::ThreadId;

/// Lifecycle of the connection handle owned by a requestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Identifies the handle an envelope was produced against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandleRef {
    pub id: u64,
    pub state: ConnectionState,
}

/// Connection metadata captured when an envelope is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub thread_id: Option<ThreadId>,
    pub handle: Option<HandleRef>,
    pub config: ConnectionConfig,
}

/// Value of a successful `disconnect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisconnectOutcome {
    pub disconnected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success {
        value: T,
        diagnostic: Option<String>,
    },
    Failure {
        error: ReqError,
        value: Option<T>,
    },
}

/// Uniform envelope returned by every connection operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    pub outcome: Outcome<T>,
    pub info: ConnectionInfo,
}

impl<T> ActionResult<T> {
    pub fn success(value: T, info: ConnectionInfo) -> Self {
        Self {
            outcome: Outcome::Success {
                value,
                diagnostic: None,
            },
            info,
        }
    }

    pub fn failure(error: impl Into<ReqError>, info: ConnectionInfo) -> Self {
        Self {
            outcome: Outcome::Failure {
                error: error.into(),
                value: None,
            },
            info,
        }
    }

    /// Attaches a note to a success. Failures are left untouched.
    pub fn with_diagnostic(mut self, note: impl Into<String>) -> Self {
        if let Outcome::Success { diagnostic, .. } = &mut self.outcome {
            *diagnostic = Some(note.into());
        }
        self
    }

    /// Attaches a partial value to a failure. Successes are left untouched.
    pub fn with_partial_value(mut self, partial: T) -> Self {
        if let Outcome::Failure { value, .. } = &mut self.outcome {
            *value = Some(partial);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success { value, .. } => Some(value),
            Outcome::Failure { value, .. } => value.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&ReqError> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { diagnostic, .. } => diagnostic.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn into_result(self) -> Result<T, ReqError> {
        match self.outcome {
            Outcome::Success { value, .. } => Ok(value),
            Outcome::Failure { error, .. } => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        let outcome = match self.outcome {
            Outcome::Success { value, diagnostic } => Outcome::Success {
                value: f(value),
                diagnostic,
            },
            Outcome::Failure { error, value } => Outcome::Failure {
                error,
                value: value.map(f),
            },
        };
        ActionResult {
            outcome,
            info: self.info,
        }
    }

    /// Carries a failure over to an envelope of another value type.
    /// Returns `None` for successes.
    pub fn into_failure<U>(self) -> Option<ActionResult<U>> {
        match self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(ActionResult {
                outcome: Outcome::Failure { error, value: None },
                info: self.info,
            }),
        }
    }
}
