//! Presto MCP Library
//!
//! SQL queries against Presto / IBM watsonx.data over HTTPS with a custom CA
//! bundle, exposed two ways:
//!
//! - [`PrestoQueryTool`]: an agent tool that answers with JSON records, or
//!   with `Error: ...` text when the query fails; served over MCP by
//!   [`PrestoMcpServer`]
//! - [`PrestoPipelineQuery`]: a pipeline node that returns a
//!   [`TabularValue`] and propagates every error
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use presto_mcp::{ConfigSource, PrestoPipelineQuery};
//!
//! let mut node = PrestoPipelineQuery::new(ConfigSource::from(descriptor_json));
//! let tables = node.run_query("SHOW TABLES").await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod presto;
pub mod serializer;
pub mod server;
pub mod settings;
pub mod status;
pub mod tool;

#[cfg(test)]
mod testing;

pub use config::{ConfigSource, ConnectionConfig};
pub use error::{ConfigError, ConnectionError, PrestoError, PrestoResult, QueryError};
pub use executor::{QueryExecutor, QueryResult};
pub use pipeline::PrestoPipelineQuery;
pub use serializer::{to_json_records, to_tabular_value, TabularValue};
pub use server::PrestoMcpServer;
pub use settings::Settings;
pub use tool::{PrestoQueryTool, QueryParams, ToolSettings};
