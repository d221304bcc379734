//! Lazily opened, reused connection slot

use tracing::{debug, info};

use crate::config::{ConfigSource, ConnectionConfig};
use crate::error::{ConnectionError, PrestoResult};
use crate::presto::{Connection, Driver};

/// Owns at most one live connection
///
/// The connection is opened on first use, reused while it reports itself
/// open, and released by [`close`](Self::close) so the next
/// [`ensure`](Self::ensure) starts from a clean session.
#[derive(Debug)]
pub struct ConnectionManager<C> {
    current: Option<C>,
}

impl<C> Default for ConnectionManager<C> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<C: Connection> ConnectionManager<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the held connection, opening a new one through `driver` if
    /// there is none or it has been closed
    ///
    /// The descriptor is only parsed when a new connection is needed.
    pub async fn ensure<D>(&mut self, driver: &D, source: &ConfigSource) -> PrestoResult<&C>
    where
        D: Driver<Connection = C>,
    {
        if let Some(conn) = self.current.take() {
            if !conn.is_closed() {
                return Ok(self.current.insert(conn));
            }
            debug!("held connection is closed, discarding");
        }

        let config = ConnectionConfig::parse(source)?;
        info!(host = %config.host, port = config.port, "connecting to Presto");

        let conn = driver.connect(&config).await.map_err(ConnectionError)?;
        Ok(self.current.insert(conn))
    }

    /// Close and forget the held connection
    pub async fn close(&mut self) {
        if let Some(conn) = self.current.take() {
            conn.close().await;
            debug!("connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.current.as_ref().is_some_and(|c| !c.is_closed())
    }

    pub fn current(&self) -> Option<&C> {
        self.current.as_ref()
    }
}
