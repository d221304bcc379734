//! Pipeline node: run one query, hand back a tabular value
//!
//! Unlike the agent tool this node keeps no session between runs and lets
//! every error propagate to the host.

use tokio::sync::watch;

use crate::config::ConfigSource;
use crate::error::PrestoResult;
use crate::executor::QueryExecutor;
use crate::presto::{Driver, PrestoDriver};
use crate::serializer::{to_tabular_value, TabularValue};
use crate::status::StatusBoard;

pub const DEFAULT_QUERY: &str = "SHOW TABLES";

pub struct PrestoPipelineQuery<D: Driver = PrestoDriver> {
    source: ConfigSource,
    executor: QueryExecutor<D>,
    status: StatusBoard,
}

impl PrestoPipelineQuery<PrestoDriver> {
    pub fn new(source: ConfigSource) -> Self {
        Self::with_driver(source, PrestoDriver::new())
    }
}

impl<D: Driver> PrestoPipelineQuery<D> {
    pub fn with_driver(source: ConfigSource, driver: D) -> Self {
        Self {
            source,
            executor: QueryExecutor::new(driver),
            status: StatusBoard::new(),
        }
    }

    /// Execute `sql` and return its rows
    ///
    /// The connection is closed afterwards, whatever the outcome.
    pub async fn run_query(&mut self, sql: &str) -> PrestoResult<TabularValue> {
        self.status.set("Initializing...");

        let outcome = self.connect_and_run(sql).await;
        self.executor.close().await;

        match &outcome {
            Ok(value) => self
                .status
                .set(format!("Query successful: {} rows", value.row_count)),
            Err(e) => self.status.set(format!("Query failed: {}", e)),
        }
        outcome
    }

    async fn connect_and_run(&mut self, sql: &str) -> PrestoResult<TabularValue> {
        self.status.set("Connecting with custom certificate...");
        self.executor.ensure_connection(&self.source).await?;

        self.status.set("Executing query...");
        let result = self.executor.execute(&self.source, sql).await?;
        Ok(to_tabular_value(result))
    }

    pub fn status(&self) -> String {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn executor(&self) -> &QueryExecutor<D> {
        &self.executor
    }
}
