use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::DriverError;
use crate::traits::Escape;
use crate::types::RawQueryResult;

/// Server-side identifier of an established connection.
pub type ThreadId = u32;

/// Creates driver connections from a configuration.
/// Creation does no I/O; the connection is opened by [`DriverConnection::connect`].
pub trait Adapter: Send + Sync {
    fn create_connection(&self, config: &ConnectionConfig) -> Box<dyn DriverConnection>;
}

/// One physical connection as seen by the requestor.
/// Drivers are responsible for:
/// - Opening and closing the connection
/// - Executing fully formatted SQL and converting results to RawQueryResult
/// - Providing the escape capability used to format values for this connection
#[async_trait]
pub trait DriverConnection: Send {
    async fn connect(&mut self) -> Result<(), DriverError>;

    async fn end(&mut self) -> Result<(), DriverError>;

    /// Execute SQL that already has every value inlined.
    async fn query(&mut self, sql: &str) -> Result<RawQueryResult, DriverError>;

    /// Present only once the server has confirmed the connection.
    fn thread_id(&self) -> Option<ThreadId>;

    fn escaper(&self) -> Arc<dyn Escape>;
}
