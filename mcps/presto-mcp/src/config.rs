//! Connection descriptor parsing
//!
//! A descriptor arrives either as JSON text or as an already-structured map
//! and is normalized into a [`ConnectionConfig`]:
//!
//! ```json
//! {
//!   "host": "presto.example.com",
//!   "port": 8443,
//!   "user": "analyst",
//!   "password": "secret",
//!   "catalog": "hive_data",
//!   "schema": "gosalesdw",
//!   "ssl_verify": "/etc/presto/chain.pem"
//! }
//! ```
//!
//! Only `password` is optional. A missing or empty password selects
//! anonymous access.

use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Required descriptor keys, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 6] = ["host", "port", "user", "catalog", "schema", "ssl_verify"];

/// Errors raised while normalizing a connection descriptor
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor text is not valid JSON
    #[error("invalid JSON in connection config: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The descriptor is neither JSON text nor a JSON object
    #[error("unsupported type for connection config: {0}")]
    UnsupportedType(&'static str),

    /// One or more required fields are missing or empty
    #[error("connection config is missing required fields: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    /// The port is not a valid TCP port number
    #[error("invalid port in connection config: {0}")]
    InvalidPort(String),
}

/// Where a connection descriptor comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// JSON-encoded descriptor text
    JsonText(String),
    /// Already-parsed descriptor
    Structured(Map<String, Value>),
}

impl From<String> for ConfigSource {
    fn from(text: String) -> Self {
        ConfigSource::JsonText(text)
    }
}

impl From<&str> for ConfigSource {
    fn from(text: &str) -> Self {
        ConfigSource::JsonText(text.to_string())
    }
}

impl From<Map<String, Value>> for ConfigSource {
    fn from(map: Map<String, Value>) -> Self {
        ConfigSource::Structured(map)
    }
}

impl TryFrom<Value> for ConfigSource {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(ConfigSource::JsonText(text)),
            Value::Object(map) => Ok(ConfigSource::Structured(map)),
            other => Err(ConfigError::UnsupportedType(json_type_name(&other))),
        }
    }
}

/// Validated connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub catalog: String,
    pub schema: String,
    /// PEM bundle used instead of the system trust store
    pub ssl_verify_path: PathBuf,
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("ssl_verify_path", &self.ssl_verify_path)
            .finish()
    }
}

impl ConnectionConfig {
    /// Normalize a descriptor into connection parameters
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is not JSON, the descriptor is
    /// not an object, a required field is missing or empty, or the port is
    /// out of range.
    pub fn parse(source: &ConfigSource) -> Result<Self, ConfigError> {
        match source {
            ConfigSource::JsonText(text) => {
                let value: Value = serde_json::from_str(text).map_err(ConfigError::InvalidJson)?;
                match value {
                    Value::Object(map) => Self::from_map(&map),
                    other => Err(ConfigError::UnsupportedType(json_type_name(&other))),
                }
            }
            ConfigSource::Structured(map) => Self::from_map(map),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, ConfigError> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| map.get(*key).map_or(true, is_falsy))
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Incomplete { missing });
        }

        Ok(Self {
            host: text_field(map, "host"),
            port: parse_port(&map["port"])?,
            user: text_field(map, "user"),
            password: map
                .get("password")
                .filter(|v| !is_falsy(v))
                .map(value_to_text),
            catalog: text_field(map, "catalog"),
            schema: text_field(map, "schema"),
            ssl_verify_path: PathBuf::from(text_field(map, "ssl_verify")),
        })
    }

    /// Base URL of the coordinator
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(value_to_text).unwrap_or_default()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_port(value: &Value) -> Result<u16, ConfigError> {
    let port = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::InvalidPort(value.to_string()))
}

/// Mirrors the truthiness the descriptor format has always used: null,
/// empty strings and collections, zero and `false` count as absent.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
