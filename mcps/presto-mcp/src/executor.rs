//! Statement execution over a managed connection

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ConfigSource;
use crate::connection::ConnectionManager;
use crate::error::{PrestoResult, QueryError};
use crate::presto::{ClientResult, Connection, Cursor, Driver};

/// Columns and rows of one executed statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names, in result order
    pub columns: Vec<String>,
    /// Rows, each with one value per column
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Build a result, checking every row has one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, QueryError> {
        if let Some((row, values)) = rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns.len())
        {
            return Err(QueryError::RowWidth {
                row,
                found: values.len(),
                expected: columns.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Runs statements against a single lazily opened connection
///
/// Any submission or fetch failure closes the connection, so the next call
/// reconnects instead of reusing a possibly broken session.
pub struct QueryExecutor<D: Driver> {
    driver: D,
    connections: ConnectionManager<D::Connection>,
}

impl<D: Driver> QueryExecutor<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            connections: ConnectionManager::new(),
        }
    }

    /// Return the held connection or open one from `source`
    pub async fn ensure_connection(&mut self, source: &ConfigSource) -> PrestoResult<&D::Connection> {
        self.connections.ensure(&self.driver, source).await
    }

    /// Execute `sql` verbatim and collect the whole result
    ///
    /// # Errors
    ///
    /// Config and connection errors come from [`ensure_connection`]
    /// (nothing is retained). Submission, fetch and result-shape errors are
    /// [`QueryError`]s and close the connection.
    ///
    /// [`ensure_connection`]: Self::ensure_connection
    pub async fn execute(&mut self, source: &ConfigSource, sql: &str) -> PrestoResult<QueryResult> {
        let mut cursor = self.ensure_connection(source).await?.cursor();

        let fetched = run_statement(&mut cursor, sql).await;
        cursor.close().await;

        let outcome = fetched
            .map_err(QueryError::Driver)
            .and_then(|(columns, rows)| QueryResult::new(columns, rows));

        match outcome {
            Ok(result) => {
                debug!(rows = result.row_count(), "statement finished");
                Ok(result)
            }
            Err(e) => {
                warn!("query failed, closing connection: {}", e);
                self.connections.close().await;
                Err(e.into())
            }
        }
    }

    /// Close and drop the held connection, if any
    pub async fn close(&mut self) {
        self.connections.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    pub fn connection(&self) -> Option<&D::Connection> {
        self.connections.current()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

async fn run_statement<C: Cursor>(
    cursor: &mut C,
    sql: &str,
) -> ClientResult<(Vec<String>, Vec<Vec<Value>>)> {
    cursor.execute(sql).await?;
    let rows = cursor.fetch_all().await?;
    Ok((cursor.column_names(), rows))
}
