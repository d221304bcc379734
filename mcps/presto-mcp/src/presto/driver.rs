//! Driver abstraction
//!
//! The executor only talks to these traits, so the HTTP client can be swapped
//! for an in-memory driver in tests.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ClientResult;
use crate::config::ConnectionConfig;

/// Opens connections to a Presto coordinator
#[async_trait]
pub trait Driver: Send + Sync {
    /// Connection type produced by this driver
    type Connection: Connection;

    /// Open a new connection described by `config`
    async fn connect(&self, config: &ConnectionConfig) -> ClientResult<Self::Connection>;
}

/// A live handle to the coordinator
#[async_trait]
pub trait Connection: Send + Sync {
    /// Cursor type handed out by this connection
    type Cursor: Cursor;

    /// Whether the connection has been closed and must not be reused
    fn is_closed(&self) -> bool;

    /// Open a cursor for a single statement
    fn cursor(&self) -> Self::Cursor;

    /// Close the connection; later cursors fail with `ClientError::Closed`
    async fn close(&self);
}

/// One statement's execution and result iteration
#[async_trait]
pub trait Cursor: Send {
    /// Submit `sql` verbatim
    async fn execute(&mut self, sql: &str) -> ClientResult<()>;

    /// Fetch every remaining row of the submitted statement
    async fn fetch_all(&mut self) -> ClientResult<Vec<Vec<Value>>>;

    /// Column names from the result description, in result order
    fn column_names(&self) -> Vec<String>;

    /// Release the cursor and any server-side resources it still holds
    async fn close(&mut self);
}
