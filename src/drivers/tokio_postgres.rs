use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error};

use crate::config::ConnectionConfig;
use crate::error::DriverError;
use crate::format::LiteralEscaper;
use crate::traits::{Adapter, DriverConnection, Escape, ThreadId};
use crate::types::RawQueryResult;

/// PostgreSQL adapter using tokio-postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

impl Adapter for PostgresAdapter {
    fn create_connection(&self, config: &ConnectionConfig) -> Box<dyn DriverConnection> {
        Box::new(PostgresConnection::new(config))
    }
}

struct Session {
    client: Client,
    task: JoinHandle<()>,
    backend_pid: ThreadId,
}

/// A single PostgreSQL session.
///
/// The backend process id serves as the thread id. With
/// `multiple_statements` enabled queries go through the simple query
/// protocol, which accepts several `;`-separated statements.
pub struct PostgresConnection {
    config: tokio_postgres::Config,
    multiple_statements: bool,
    session: Option<Session>,
}

impl PostgresConnection {
    pub fn new(config: &ConnectionConfig) -> Self {
        let mut pg = tokio_postgres::Config::new();
        if let Some(host) = &config.host {
            pg.host(host);
        }
        if let Some(port) = config.port {
            pg.port(port);
        }
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        if let Some(database) = &config.database {
            pg.dbname(database);
        }
        if let Some(charset) = &config.charset {
            pg.options(&format!("-c client_encoding={}", charset));
        }

        Self {
            config: pg,
            multiple_statements: config.multiple_statements_enabled(),
            session: None,
        }
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.session
            .as_ref()
            .map(|s| &s.client)
            .ok_or(DriverError::NotConnected)
    }

    async fn simple_query(&self, sql: &str) -> Result<RawQueryResult, DriverError> {
        let messages = self
            .client()?
            .simple_query(sql)
            .await
            .map_err(|e| DriverError::QueryFailed(e.to_string()))?;

        let mut result = SimpleResult::default();
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    result.describe(columns.iter().map(|c| c.name().to_string()).collect());
                }
                SimpleQueryMessage::Row(row) => {
                    if !result.is_described() {
                        result.describe(row.columns().iter().map(|c| c.name().to_string()).collect());
                    }
                    result.row((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
                }
                SimpleQueryMessage::CommandComplete(n) => result.complete(n),
                _ => {}
            }
        }
        Ok(result.finish())
    }

    async fn extended_query(&self, sql: &str) -> Result<RawQueryResult, DriverError> {
        let client = self.client()?;
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| DriverError::QueryFailed(e.to_string()))?;

        if statement.columns().is_empty() {
            let n = client
                .execute(&statement, &[])
                .await
                .map_err(|e| DriverError::QueryFailed(e.to_string()))?;
            return Ok(RawQueryResult::affected(n));
        }

        let rows = client
            .query(&statement, &[])
            .await
            .map_err(|e| DriverError::QueryFailed(e.to_string()))?;

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let result_rows = rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| row_value_to_string(row, i, col.type_()))
                    .collect()
            })
            .collect();

        Ok(RawQueryResult::new(columns, result_rows))
    }
}

/// Folds simple-query messages into one result.
///
/// The last statement that returned a result set supplies the columns and
/// rows, even when it matched nothing. Only statements without a result set
/// count toward `rows_affected`.
#[derive(Default)]
struct SimpleResult {
    result: RawQueryResult,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Option<String>>>,
}

impl SimpleResult {
    fn is_described(&self) -> bool {
        self.columns.is_some()
    }

    fn describe(&mut self, columns: Vec<String>) {
        self.columns = Some(columns);
        self.rows.clear();
    }

    fn row(&mut self, values: Vec<Option<String>>) {
        self.rows.push(values);
    }

    fn complete(&mut self, n: u64) {
        match self.columns.take() {
            Some(columns) => {
                self.result.columns = columns;
                self.result.rows = std::mem::take(&mut self.rows);
            }
            None => self.result.rows_affected += n,
        }
    }

    fn finish(self) -> RawQueryResult {
        self.result
    }
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.session.is_some() {
            return Ok(());
        }

        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        // Spawn the connection handler
        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        let pid: i32 = match client.query_one("SELECT pg_backend_pid()", &[]).await {
            Ok(row) => row.get(0),
            Err(e) => {
                drop(client);
                task.abort();
                return Err(DriverError::ConnectionFailed(e.to_string()));
            }
        };
        debug!(backend_pid = pid, "PostgreSQL session established");

        self.session = Some(Session {
            client,
            task,
            backend_pid: pid as ThreadId,
        });
        Ok(())
    }

    async fn end(&mut self) -> Result<(), DriverError> {
        let Session { client, task, .. } = self.session.take().ok_or(DriverError::NotConnected)?;
        // The connection future resolves once every client handle is gone.
        drop(client);
        task.await.map_err(|e| DriverError::EndFailed(e.to_string()))
    }

    async fn query(&mut self, sql: &str) -> Result<RawQueryResult, DriverError> {
        if self.multiple_statements {
            self.simple_query(sql).await
        } else {
            self.extended_query(sql).await
        }
    }

    fn thread_id(&self) -> Option<ThreadId> {
        self.session.as_ref().map(|s| s.backend_pid)
    }

    fn escaper(&self) -> Arc<dyn Escape> {
        Arc::new(LiteralEscaper)
    }
}

/// Convert a row value at a given index to a string. SQL `NULL` is `None`.
fn row_value_to_string(row: &tokio_postgres::Row, index: usize, type_: &Type) -> Option<String> {
    if let Ok(val) = row.try_get::<_, Option<i32>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<i64>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<i16>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<String>>(index) {
        return val;
    }

    if let Ok(val) = row.try_get::<_, Option<bool>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<f64>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<f32>>(index) {
        return val.map(|v| v.to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<chrono::NaiveDateTime>>(index) {
        return val.map(|v| v.format(crate::types::DATETIME_FORMAT).to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(index) {
        return val.map(|v| v.format(crate::types::DATETIME_FORMAT).to_string());
    }

    if let Ok(val) = row.try_get::<_, Option<chrono::NaiveDate>>(index) {
        return val.map(|v| v.to_string());
    }

    // Fallback
    debug!(column = index, type_name = type_.name(), "unsupported column type");
    Some(format!("<{}>", type_.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_translated() {
        let conn = PostgresConnection::new(
            &ConnectionConfig::new()
                .host("db.local")
                .port(6543)
                .user("app")
                .password("pw")
                .database("shop")
                .charset("UTF8"),
        );
        assert_eq!(conn.config.get_user(), Some("app"));
        assert_eq!(conn.config.get_dbname(), Some("shop"));
        assert_eq!(conn.config.get_ports(), &[6543]);
        assert_eq!(conn.config.get_options(), Some("-c client_encoding=UTF8"));
        assert!(!conn.multiple_statements);
        assert_eq!(conn.thread_id(), None);
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_simple_result_keeps_columns_of_empty_result_set() {
        let mut result = SimpleResult::default();
        result.describe(names(&["id", "name"]));
        result.complete(0);

        let raw = result.finish();
        assert_eq!(raw.columns, names(&["id", "name"]));
        assert!(raw.rows.is_empty());
        assert_eq!(raw.rows_affected, 0);
    }

    #[test]
    fn test_simple_result_counts_only_modifying_statements() {
        let mut result = SimpleResult::default();
        // UPDATE t ...; SELECT id FROM t; DELETE FROM u ...
        result.complete(3);
        result.describe(names(&["id"]));
        result.row(vec![Some("1".to_string())]);
        result.row(vec![None]);
        result.complete(2);
        result.complete(4);

        let raw = result.finish();
        assert_eq!(raw.columns, names(&["id"]));
        assert_eq!(raw.rows, vec![vec![Some("1".to_string())], vec![None]]);
        assert_eq!(raw.rows_affected, 7);
    }

    #[test]
    fn test_simple_result_last_result_set_wins() {
        let mut result = SimpleResult::default();
        result.describe(names(&["a"]));
        result.row(vec![Some("x".to_string())]);
        result.complete(1);
        result.describe(names(&["b"]));
        result.complete(0);

        let raw = result.finish();
        assert_eq!(raw.columns, names(&["b"]));
        assert!(raw.rows.is_empty());
    }

    #[tokio::test]
    async fn test_query_before_connect_is_rejected() {
        let mut conn = PostgresConnection::new(&ConnectionConfig::new().multiple_statements(true));
        assert_eq!(conn.query("SELECT 1").await, Err(DriverError::NotConnected));
        assert_eq!(conn.end().await, Err(DriverError::NotConnected));
    }
}
