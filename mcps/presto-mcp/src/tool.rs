//! Agent tool wrapping the query executor
//!
//! The tool takes a single `sql_query` argument and always answers with
//! text: the JSON records on success, or an `Error: ...` line the agent can
//! reason about when the query fails. Config and connection failures are not
//! query failures and still surface as errors.

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::config::{ConfigSource, ConnectionConfig};
use crate::error::{ConfigError, PrestoError, QueryError};
use crate::executor::QueryExecutor;
use crate::presto::{Driver, PrestoDriver};
use crate::serializer::to_json_records;
use crate::status::{truncate_query, StatusBoard};

pub const DEFAULT_TOOL_NAME: &str = "presto_query_tool";
pub const DEFAULT_TOOL_DESCRIPTION: &str =
    "Runs a SQL query on a Presto database and returns the result as a JSON string.";

/// Prefix of the text returned for a failed query
pub const QUERY_ERROR_PREFIX: &str = "Error: Query failed with exception: ";

/// Arguments accepted by the tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// The SQL query to execute on the Presto database.
    pub sql_query: String,
}

/// Name and description presented to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_name() -> String {
    DEFAULT_TOOL_NAME.to_string()
}

fn default_description() -> String {
    DEFAULT_TOOL_DESCRIPTION.to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
        }
    }
}

/// JSON schema of [`QueryParams`]
pub fn query_params_schema() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(QueryParams);
    match serde_json::to_value(schema) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Turn a query outcome into the text handed back to the agent
pub fn query_outcome_to_text(outcome: Result<String, QueryError>) -> String {
    match outcome {
        Ok(records) => records,
        Err(e) => format!("{}{}", QUERY_ERROR_PREFIX, e),
    }
}

/// SQL query tool for LLM agents
pub struct PrestoQueryTool<D: Driver = PrestoDriver> {
    settings: ToolSettings,
    source: ConfigSource,
    executor: Mutex<QueryExecutor<D>>,
    status: StatusBoard,
}

impl PrestoQueryTool<PrestoDriver> {
    /// Build the tool over the HTTPS driver
    pub fn new(source: ConfigSource, settings: ToolSettings) -> Result<Self, ConfigError> {
        Self::with_driver(source, settings, PrestoDriver::new())
    }
}

impl<D: Driver> PrestoQueryTool<D> {
    /// Build the tool over any driver
    ///
    /// The descriptor is validated here so a broken config fails at
    /// construction rather than on the agent's first call.
    pub fn with_driver(
        source: ConfigSource,
        settings: ToolSettings,
        driver: D,
    ) -> Result<Self, ConfigError> {
        ConnectionConfig::parse(&source)?;

        let tool = Self {
            settings,
            source,
            executor: Mutex::new(QueryExecutor::new(driver)),
            status: StatusBoard::new(),
        };
        tool.status.set("Presto DB Tool created");
        Ok(tool)
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn description(&self) -> &str {
        &self.settings.description
    }

    /// Tool definition advertised to agents
    pub fn definition(&self) -> Tool {
        Tool::new(
            self.settings.name.clone(),
            self.settings.description.clone(),
            query_params_schema(),
        )
    }

    pub fn status(&self) -> String {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    /// Run `sql_query` and return the text for the agent
    ///
    /// # Errors
    ///
    /// Only config and connection failures are returned as `Err`; query
    /// failures become `Ok` text starting with `Error:`.
    pub async fn run(&self, sql_query: &str) -> Result<String, PrestoError> {
        self.status
            .set(format!("Executing query: {}...", truncate_query(sql_query, 50)));

        let mut executor = self.executor.lock().await;

        let outcome = match executor.execute(&self.source, sql_query).await {
            Ok(result) => {
                let rows = result.row_count();
                to_json_records(&result).map(|json| (json, rows))
            }
            Err(PrestoError::Query(e)) => Err(e),
            Err(fatal) => {
                let phase = match &fatal {
                    PrestoError::Config(_) => "Invalid connection config",
                    _ => "Connection failed",
                };
                self.status.set(format!("{}: {}", phase, fatal));
                return Err(fatal);
            }
        };

        match &outcome {
            Ok((_, rows)) => self.status.set(format!("Query successful: {} rows", rows)),
            Err(e) => {
                // an unencodable result still ends the session
                executor.close().await;
                self.status.set(format!("Query failed: {}", e));
            }
        }

        Ok(query_outcome_to_text(outcome.map(|(json, _)| json)))
    }

    /// Whether a connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.executor.lock().await.is_connected()
    }

    /// Drop the held connection; the next call reconnects
    pub async fn disconnect(&self) {
        self.executor.lock().await.close().await;
    }
}
