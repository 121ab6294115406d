//! Serialized access to a single database connection.
//!
//! A [`Requestor`] owns at most one connection handle and lets any number of
//! tasks issue `connect`, `query` and `disconnect` against it. Operations run
//! one at a time in arrival order; a query issued while disconnected
//! connects first. Every operation answers with an [`ActionResult`] rather
//! than an `Err`.

mod slot;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::config::ConnectionConfig;
use crate::error::{DriverError, ReqError, Result};
use crate::format::QueryFormat;
use crate::traits::{Adapter, DriverConnection, ThreadId};
use crate::types::{
    ActionResult, ConnectionInfo, ConnectionState, DisconnectOutcome, HandleRef, QueryResult,
    RawQueryResult, Values,
};

use self::slot::LockSlot;

struct Handle {
    id: u64,
    conn: Box<dyn DriverConnection>,
    format: QueryFormat,
    thread_id: Option<ThreadId>,
    state: ConnectionState,
}

/// Everything the lock protects.
#[derive(Default)]
struct Inner {
    config: ConnectionConfig,
    handle: Option<Handle>,
    slot: LockSlot,
    handles_created: u64,
}

impl Inner {
    fn thread_id(&self) -> Option<ThreadId> {
        self.handle.as_ref().and_then(|h| h.thread_id)
    }

    fn is_connected(&self) -> bool {
        self.thread_id().is_some()
    }

    fn state(&self) -> ConnectionState {
        self.handle
            .as_ref()
            .map_or(ConnectionState::Disconnected, |h| h.state)
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            thread_id: self.thread_id(),
            handle: self.handle.as_ref().map(|h| HandleRef {
                id: h.id,
                state: h.state,
            }),
            config: self.config.clone(),
        }
    }

    fn handle_mut(handle: &mut Option<Handle>) -> Result<&mut Handle> {
        handle
            .as_mut()
            .ok_or_else(|| ReqError::ConnectionInvariant("no connection handle to operate on".to_string()))
    }

    async fn run_connect(&mut self) -> Result<ThreadId> {
        let Inner { handle, slot, .. } = self;
        let handle = Self::handle_mut(handle)?;
        let _occupied = slot.occupy("connect()")?;

        handle.state = ConnectionState::Connecting;
        handle.conn.connect().await?;

        let thread_id = handle.conn.thread_id().ok_or_else(|| {
            DriverError::ConnectionFailed("driver did not report a thread id".to_string())
        })?;
        handle.thread_id = Some(thread_id);
        handle.state = ConnectionState::Connected;
        Ok(thread_id)
    }

    /// Ends the driver connection. Returns the thread id the driver still
    /// reports afterwards, which should be none.
    async fn run_end(&mut self) -> Result<Option<ThreadId>> {
        let Inner { handle, slot, .. } = self;
        let handle = Self::handle_mut(handle)?;
        let _occupied = slot.occupy("disconnect()")?;

        handle.state = ConnectionState::Disconnecting;
        if let Err(e) = handle.conn.end().await {
            handle.state = ConnectionState::Connected;
            return Err(e.into());
        }
        Ok(handle.conn.thread_id())
    }

    async fn run_query(&mut self, sql: &str, values: Option<&Values>) -> Result<RawQueryResult> {
        let Inner { handle, slot, .. } = self;
        let handle = Self::handle_mut(handle)?;
        let _occupied = slot.occupy(format!("query(): {}", sql))?;

        let formatted = handle.format.query_format(sql, values)?;
        debug!(thread_id = ?handle.thread_id, sql = %formatted, "sending query");
        Ok(handle.conn.query(&formatted).await?)
    }
}

/// Owner of one lazily created, exclusively accessed connection.
pub struct Requestor {
    adapter: Arc<dyn Adapter>,
    inner: Mutex<Inner>,
}

impl Requestor {
    /// Create a requestor with no configuration yet.
    /// [`Requestor::set_connection_config`] must be called before connecting.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Create a requestor with a validated configuration.
    pub fn with_config(adapter: Arc<dyn Adapter>, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            adapter,
            inner: Mutex::new(Inner {
                config,
                ..Inner::default()
            }),
        })
    }

    /// Replace the configuration. Fails while a connection handle exists.
    pub async fn set_connection_config(&self, config: ConnectionConfig) -> Result<ConnectionConfig> {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_some() {
            return Err(ReqError::ConfigImmutable);
        }
        config.validate()?;
        inner.config = config.clone();
        Ok(config)
    }

    pub async fn connection_config(&self) -> ConnectionConfig {
        self.inner.lock().await.config.clone()
    }

    pub async fn connection_info(&self) -> ConnectionInfo {
        self.inner.lock().await.info()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state()
    }

    pub async fn has_connection(&self) -> bool {
        self.inner.lock().await.handle.is_some()
    }

    pub async fn thread_id(&self) -> Option<ThreadId> {
        self.inner.lock().await.thread_id()
    }

    /// Waits out any in-flight operation, then reports whether the driver has
    /// confirmed the connection.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_connected()
    }

    /// Connect unless already connected. Returns the connection's thread id.
    #[instrument(skip_all)]
    pub async fn connect(&self) -> ActionResult<ThreadId> {
        let mut inner = self.inner.lock().await;
        self.connect_locked(&mut inner).await
    }

    /// Close the connection. `disconnected` is false when there was nothing
    /// to close.
    #[instrument(skip_all)]
    pub async fn disconnect(&self) -> ActionResult<DisconnectOutcome> {
        let mut inner = self.inner.lock().await;
        Self::disconnect_locked(&mut inner).await
    }

    /// Disconnect and drop the handle, even when the driver fails to close it.
    /// Returns whether there was a handle to remove.
    #[instrument(skip_all)]
    pub async fn remove_connection(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_none() {
            return false;
        }

        let result = Self::disconnect_locked(&mut inner).await;
        if let Some(e) = result.error() {
            warn!(error = %e, "dropping connection handle after failed disconnect");
        }
        inner.handle = None;
        debug!("connection removed");
        true
    }

    /// Run `sql` with `values` substituted in.
    pub async fn query(&self, sql: &str, values: Option<&Values>) -> ActionResult<QueryResult> {
        self.query_map(sql, values, |result| result).await
    }

    /// Run `sql` and transform the result with `after` before wrapping it.
    #[instrument(skip_all, fields(sql = %sql))]
    pub async fn query_map<T, F>(&self, sql: &str, values: Option<&Values>, after: F) -> ActionResult<T>
    where
        F: FnOnce(QueryResult) -> T + Send,
        T: Send,
    {
        let mut inner = self.inner.lock().await;

        if !inner.is_connected() {
            debug!("not connected, attempting automatic connection");
            let connected = self.connect_locked(&mut inner).await;
            if let Some(failed) = connected.into_failure() {
                debug!("automatic connection failed, query not sent");
                return failed;
            }
        }

        match inner.run_query(sql, values).await {
            Ok(raw) => {
                let value = after(QueryResult::from_raw(raw));
                ActionResult::success(value, inner.info())
            }
            Err(e) => {
                warn!(thread_id = ?inner.thread_id(), error = %e, "query failed");
                Self::failure(e, &inner)
            }
        }
    }

    fn create_connection(&self, inner: &mut Inner) -> Result<()> {
        if inner.handle.is_some() {
            return Err(ReqError::ConnectionInvariant(
                "cannot create another connection".to_string(),
            ));
        }
        inner.config.validate()?;

        let conn = self.adapter.create_connection(&inner.config);
        let format = QueryFormat::new(conn.escaper());
        inner.handles_created += 1;
        let id = inner.handles_created;
        inner.handle = Some(Handle {
            id,
            conn,
            format,
            thread_id: None,
            state: ConnectionState::Connecting,
        });
        debug!(handle_id = id, "connection created");
        Ok(())
    }

    async fn connect_locked(&self, inner: &mut Inner) -> ActionResult<ThreadId> {
        if let Some(thread_id) = inner.thread_id() {
            return ActionResult::success(thread_id, inner.info()).with_diagnostic("already connected");
        }

        if inner.handle.is_none() {
            debug!("no connection, creating one");
            if let Err(e) = self.create_connection(inner) {
                return Self::failure(e, inner);
            }
        }

        debug!("connecting");
        match inner.run_connect().await {
            Ok(thread_id) => {
                debug!(thread_id, "connected to database");
                ActionResult::success(thread_id, inner.info())
            }
            Err(e) => {
                warn!(error = %e, "trouble connecting");
                Self::failure(e, inner)
            }
        }
    }

    async fn disconnect_locked(inner: &mut Inner) -> ActionResult<DisconnectOutcome> {
        if !inner.is_connected() {
            return ActionResult::success(DisconnectOutcome { disconnected: false }, inner.info());
        }

        let thread_id = inner.thread_id();
        let lingering = match inner.run_end().await {
            Ok(lingering) => lingering,
            Err(e) => {
                warn!(?thread_id, error = %e, "difficulties disconnecting");
                return Self::failure(e, inner);
            }
        };
        inner.handle = None;
        debug!(?thread_id, "disconnected");

        let done = DisconnectOutcome { disconnected: true };
        if let Some(still) = lingering {
            return Self::failure(
                ReqError::ConnectionInvariant(format!(
                    "driver still reports thread {} after disconnect",
                    still
                )),
                inner,
            )
            .with_partial_value(done);
        }
        ActionResult::success(done, inner.info())
    }

    fn failure<T>(error: ReqError, inner: &Inner) -> ActionResult<T> {
        if let ReqError::ConnectionInvariant(msg) = &error {
            error!(thread_id = ?inner.thread_id(), "{}", msg);
        }
        ActionResult::failure(error, inner.info())
    }
}
