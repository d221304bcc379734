//! Settings for presto-mcp
//!
//! Loaded from:
//! 1. `PRESTO_MCP_CONFIG_PATH` environment variable
//! 2. `~/.binks/presto.toml`
//! 3. Defaults, when no file exists
//!
//! `PRESTO_CONNECTION_CONFIG` overrides the connection descriptor.
//!
//! ```toml
//! [connection]
//! config = '''
//! {"host": "presto.example.com", "port": 8443, "user": "analyst",
//!  "catalog": "hive_data", "schema": "gosalesdw", "ssl_verify": "/etc/presto/chain.pem"}
//! '''
//!
//! [tool]
//! name = "presto_query_tool"
//! description = "Runs a SQL query on a Presto database and returns the result as a JSON string."
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, ConfigSource};
use crate::tool::ToolSettings;

pub const CONFIG_PATH_ENV: &str = "PRESTO_MCP_CONFIG_PATH";
pub const CONNECTION_ENV: &str = "PRESTO_CONNECTION_CONFIG";

/// Descriptor shown when nothing is configured
pub const TEMPLATE_CONNECTION_CONFIG: &str = r#"{
  "host": "your-presto-host",
  "port": 12345,
  "user": "your-user",
  "password": "your-password",
  "catalog": "your-catalog",
  "schema": "your-schema",
  "ssl_verify": "/path/to/your/cert.pem"
}"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub tool: ToolSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// JSON descriptor text, or a table with the same keys
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl Settings {
    /// Load settings from the configured path, falling back to defaults
    pub fn load() -> Result<Self> {
        let mut settings = match Self::find_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => {
                tracing::info!("No config path available, using defaults");
                Self::default()
            }
        };

        if let Ok(descriptor) = std::env::var(CONNECTION_ENV) {
            settings.set_connection_text(descriptor);
        }

        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".binks").join("presto.toml"))
    }

    pub fn set_connection_text(&mut self, descriptor: impl Into<String>) {
        self.connection.config = Some(toml::Value::String(descriptor.into()));
    }

    /// The connection descriptor as a config source
    ///
    /// Missing configuration yields the template descriptor, which parses but
    /// points at a placeholder host.
    pub fn connection_source(&self) -> Result<ConfigSource, ConfigError> {
        match &self.connection.config {
            None => Ok(ConfigSource::JsonText(TEMPLATE_CONNECTION_CONFIG.to_string())),
            Some(toml::Value::String(text)) => Ok(ConfigSource::JsonText(text.clone())),
            Some(other) => {
                let json = serde_json::to_value(other).map_err(ConfigError::InvalidJson)?;
                ConfigSource::try_from(json)
            }
        }
    }
}
