use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReqError, Result};

/// Connection configuration handed to the driver adapter.
///
/// `host`, `user`, `password` and `database` must all be present before a
/// connection can be created. Presence is what counts: an empty password is
/// still a password.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub multiple_statements: Option<bool>,
}

impl ConnectionConfig {
    pub const REQUIRED: [&'static str; 4] = ["host", "user", "password", "database"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn multiple_statements(mut self, enabled: bool) -> Self {
        self.multiple_statements = Some(enabled);
        self
    }

    /// Names of required fields that are absent, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            self.host.is_some(),
            self.user.is_some(),
            self.password.is_some(),
            self.database.is_some(),
        ];
        Self::REQUIRED
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_missing_required(&self) -> bool {
        !self.missing_fields().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReqError::MissingConfig(missing))
        }
    }

    pub fn multiple_statements_enabled(&self) -> bool {
        self.multiple_statements.unwrap_or(false)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("collation", &self.collation)
            .field("multiple_statements", &self.multiple_statements)
            .finish()
    }
}
