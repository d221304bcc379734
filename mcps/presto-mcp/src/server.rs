//! Presto MCP Server implementation
//!
//! The tool name comes from settings, so the handler lists and dispatches
//! tools by hand instead of through the `#[tool_router]` macros.

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer,
};
use serde_json::Value;
use std::sync::Arc;

use crate::presto::{Driver, PrestoDriver};
use crate::settings::Settings;
use crate::tool::{PrestoQueryTool, QueryParams};

/// The main Presto MCP Server
pub struct PrestoMcpServer<D: Driver = PrestoDriver> {
    tool: Arc<PrestoQueryTool<D>>,
}

impl<D: Driver> Clone for PrestoMcpServer<D> {
    fn clone(&self) -> Self {
        Self {
            tool: Arc::clone(&self.tool),
        }
    }
}

impl PrestoMcpServer<PrestoDriver> {
    /// Build the server from loaded settings
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = settings.connection_source()?;
        let tool = PrestoQueryTool::new(source, settings.tool.clone())?;
        tracing::info!("Presto MCP server ready, tool `{}`", tool.name());
        Ok(Self::new(tool))
    }
}

impl<D: Driver> PrestoMcpServer<D> {
    pub fn new(tool: PrestoQueryTool<D>) -> Self {
        Self {
            tool: Arc::new(tool),
        }
    }

    pub fn tool(&self) -> &PrestoQueryTool<D> {
        &self.tool
    }

    pub fn tools(&self) -> Vec<Tool> {
        vec![self.tool.definition()]
    }

    /// Route a tool call by name
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        if name != self.tool.name() {
            return Err(McpError::invalid_params(
                format!("unknown tool: {}", name),
                Some(serde_json::json!({ "name": name })),
            ));
        }

        let args = Value::Object(arguments.unwrap_or_default());
        let params: QueryParams = serde_json::from_value(args)
            .map_err(|e| McpError::invalid_params(format!("invalid arguments: {}", e), None))?;

        let text = self
            .tool
            .run(&params.sql_query)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

impl<D: Driver + 'static> rmcp::ServerHandler for PrestoMcpServer<D> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "Presto SQL query MCP server. Use {} to run a SQL query against the \
                configured catalog and schema; results come back as a JSON array of rows.",
                self.tool.name()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}
