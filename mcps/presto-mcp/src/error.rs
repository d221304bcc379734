//! Error kinds surfaced by the query components
//!
//! - [`ConfigError`]: bad descriptor; the caller has to fix its input
//! - [`ConnectionError`]: the connection could not be opened
//! - [`QueryError`]: the statement failed or its result could not be encoded

use thiserror::Error;

pub use crate::config::ConfigError;
use crate::presto::ClientError;

/// Failure to open a connection to the coordinator
#[derive(Debug, Error)]
#[error("failed to connect to Presto: {0}")]
pub struct ConnectionError(#[source] pub ClientError);

/// Failure while running a statement or encoding its result
#[derive(Debug, Error)]
pub enum QueryError {
    /// Submission or fetch failed in the driver
    #[error("{0}")]
    Driver(#[source] ClientError),

    /// A row does not match the column list
    #[error("row {row} has {found} values but the result has {expected} columns")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// Record encoding needs unique column names
    #[error("result columns must be unique, `{0}` appears more than once")]
    DuplicateColumn(String),

    /// JSON encoding failed
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Any failure of a query component
#[derive(Debug, Error)]
pub enum PrestoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),
}

/// Result type alias for query components
pub type PrestoResult<T> = Result<T, PrestoError>;
