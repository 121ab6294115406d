//! sqlreq - serialized, lazily connected access to a SQL database
//!
//! A [`Requestor`] owns one connection, connects on first use and runs
//! operations one at a time. Queries take `:name` or `:?` placeholders whose
//! values are escaped by the connection's driver before being inlined.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use sqlreq::drivers::PostgresAdapter;
//! use sqlreq::{ConnectionConfig, Requestor, ValueMap, Values};
//!
//! let config = ConnectionConfig::new()
//!     .host("localhost")
//!     .user("app")
//!     .password("secret")
//!     .database("shop");
//! let requestor = Requestor::with_config(Arc::new(PostgresAdapter), config)?;
//!
//! let values = Values::from(ValueMap::new().with("name", "John"));
//! let row = requestor
//!     .query("SELECT id, name FROM users WHERE name = :name", Some(&values))
//!     .await
//!     .into_result()?
//!     .single_row()?;
//!
//! let id = row.get("id")?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod format;
pub mod requestor;
pub mod traits;
pub mod types;

// Re-export main types for convenient access
pub use config::ConnectionConfig;
pub use error::{DriverError, FormatError, ReqError, Result};
pub use format::{substitute, LiteralEscaper, QueryFormat};
pub use requestor::Requestor;
pub use traits::{Adapter, DriverConnection, Escape, ThreadId};
pub use types::{
    ActionResult, ConnectionInfo, ConnectionState, DisconnectOutcome, Outcome, QueryResult,
    RawQueryResult, Row, SqlValue, Value, ValueMap, Values,
};
