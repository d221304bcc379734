//! Presto MCP Server
//!
//! Runs SQL against Presto / IBM watsonx.data and exposes the query tool over
//! MCP stdio.
//!
//! # Usage
//!
//! Serve over stdio (the default):
//! ```bash
//! presto-mcp
//! ```
//!
//! Run one query and print the result:
//! ```bash
//! presto-mcp query "SHOW TABLES"
//! ```
//!
//! Or configure in `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "presto": {
//!       "command": "./mcps/presto-mcp/target/release/presto-mcp",
//!       "env": { "PRESTO_MCP_CONFIG_PATH": "/etc/presto-mcp/presto.toml" }
//!     }
//!   }
//! }
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rmcp::{transport::stdio, ServiceExt};

use presto_mcp::logging::init_tracing;
use presto_mcp::pipeline::DEFAULT_QUERY;
use presto_mcp::{PrestoMcpServer, PrestoPipelineQuery, PrestoQueryTool, Settings};

#[derive(Parser)]
#[command(name = "presto-mcp")]
#[command(about = "SQL queries against Presto over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file, instead of PRESTO_MCP_CONFIG_PATH or ~/.binks/presto.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection descriptor as JSON text
    #[arg(long, global = true)]
    connection: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the query tool over MCP stdio
    Serve,
    /// Run a single query and print the result
    Query {
        /// SQL to execute
        #[arg(default_value = DEFAULT_QUERY)]
        sql: String,

        /// Print the agent tool's JSON records instead of the tabular value
        #[arg(long)]
        records: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    if let Some(descriptor) = cli.connection {
        settings.set_connection_text(descriptor);
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&settings).await,
        Commands::Query { sql, records } => query(&settings, &sql, records).await,
    }
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    tracing::info!("Starting Presto MCP Server");

    let server = PrestoMcpServer::from_settings(settings)?;
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");

    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}

async fn query(settings: &Settings, sql: &str, records: bool) -> anyhow::Result<()> {
    let source = settings.connection_source()?;

    if records {
        let tool = PrestoQueryTool::new(source, settings.tool.clone())?;
        let text = tool.run(sql).await?;
        tool.disconnect().await;
        println!("{}", text);
        return Ok(());
    }

    let mut node = PrestoPipelineQuery::new(source);
    let value = node.run_query(sql).await?;
    let json = serde_json::to_string_pretty(&value).context("Failed to encode result")?;
    println!("{}", json);
    Ok(())
}
