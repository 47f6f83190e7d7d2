//! MCP server integration (stdio + Streamable HTTP) for the tool registries.
//!
//! - `tools/list` answers with the registry's descriptors in declaration order
//! - `tools/call` dispatches by name; tool failures come back as `isError`
//!   results carrying `{kind, message}` in `structuredContent`, while an
//!   unknown tool name is a JSON-RPC invalid-params error

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool as McpTool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};

use crate::core::{ToolDescriptor, ToolError, ToolOutput};
use crate::tools::{build_registry, ToolRegistry, ToolSettings, Variant};

/// The MCP server handler for one tool variant.
#[derive(Clone)]
pub struct ToolsSvc {
    variant: Variant,
    registry: ToolRegistry,
}

impl ToolsSvc {
    pub fn new(variant: Variant, registry: ToolRegistry) -> Self {
        Self { variant, registry }
    }

    pub fn from_settings(variant: Variant, settings: &ToolSettings) -> Result<Self, ToolError> {
        Ok(Self::new(variant, build_registry(variant, settings)?))
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn mcp_tools(&self) -> Vec<McpTool> {
        self.registry.list().into_iter().map(to_mcp_tool).collect()
    }

    /// Run one `tools/call` against the registry.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
        let args = JsonValue::Object(arguments.unwrap_or_default());
        tracing::debug!(tool = name, args = %args, "tools/call");
        match self.registry.call(name, &args).await {
            Ok(out) => Ok(success_result(out)),
            Err(ToolError::UnknownTool(name)) => Err(McpError::invalid_params(
                format!("Unknown tool '{name}'"),
                Some(json!({"tool": name})),
            )),
            Err(err) => Ok(error_result(&err)),
        }
    }
}

pub fn to_mcp_tool(d: ToolDescriptor) -> McpTool {
    let schema = match d.input_schema {
        JsonValue::Object(map) => map,
        _ => JsonObject::new(),
    };
    McpTool::new(d.name, d.description, Arc::new(schema))
}

pub fn success_result(out: ToolOutput) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(out.text)]);
    result.structured_content = out.structured;
    result
}

pub fn error_result(err: &ToolError) -> CallToolResult {
    let message = err.to_string();
    let mut result = CallToolResult::error(vec![Content::text(message.clone())]);
    result.structured_content = Some(json!({"kind": err.kind(), "message": message}));
    result
}

impl ServerHandler for ToolsSvc {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = Implementation::from_build_env();
        implementation.name = self.variant.server_name().to_string();
        implementation.version = env!("CARGO_PKG_VERSION").to_string();
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: implementation,
            instructions: Some(self.variant.instructions().to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.mcp_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}
