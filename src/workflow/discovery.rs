//! Launch tool servers as stdio children of this binary and ask them what
//! they offer. One connection per server, closed before the next opens.

use std::path::Path;
use std::time::Duration;

use rmcp::model::{CallToolRequestParam, CallToolResult, JsonObject, Tool as McpTool};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Command;

use crate::core::{ToolDescriptor, WorkflowError};
use crate::domain::ToolServer;
use crate::tools::Variant;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Path of the running executable, used to launch sibling tool servers.
pub fn self_command() -> Result<String, WorkflowError> {
    let exe = std::env::current_exe()?;
    Ok(exe.to_string_lossy().into_owned())
}

/// Launch description for `variant`, without discovered tools.
pub fn tool_server(variant: Variant, command: impl Into<String>) -> ToolServer {
    ToolServer {
        name: variant.server_name().to_string(),
        variant,
        command: command.into(),
        args: vec![
            "serve".to_string(),
            "--mode".to_string(),
            "stdio".to_string(),
            "--variant".to_string(),
            variant.as_str().to_string(),
        ],
        tools: Vec::new(),
    }
}

fn discovery_error(server: &ToolServer, err: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::Discovery {
        server: server.name.clone(),
        message: err.to_string(),
    }
}

/// Convert an advertised MCP tool into our descriptor shape.
pub fn to_descriptor(tool: &McpTool) -> Result<ToolDescriptor, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(tool)?)
}

/// A live client connection to one child tool server.
pub struct ToolSession {
    server: ToolServer,
    client: RunningService<RoleClient, ()>,
}

impl ToolSession {
    pub async fn open(server: &ToolServer) -> Result<Self, WorkflowError> {
        let mut cmd = Command::new(Path::new(&server.command));
        cmd.args(&server.args)
            // keep the child's own logging out of the way unless asked for
            .env("LOG_LEVEL", std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".into()))
            .kill_on_drop(true);

        let transport = TokioChildProcess::new(cmd).map_err(|e| discovery_error(server, e))?;
        let client = tokio::time::timeout(CONNECT_TIMEOUT, ().serve(transport))
            .await
            .map_err(|_| discovery_error(server, "timed out waiting for initialize"))?
            .map_err(|e| discovery_error(server, e))?;

        if let Some(info) = client.peer_info() {
            tracing::debug!(server = %server.name, reported = %info.server_info.name, "connected");
        }
        Ok(Self {
            server: server.clone(),
            client,
        })
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, WorkflowError> {
        let tools = self
            .client
            .list_all_tools()
            .await
            .map_err(|e| discovery_error(&self.server, e))?;
        let mut out = Vec::with_capacity(tools.len());
        for tool in &tools {
            out.push(to_descriptor(tool)?);
        }
        Ok(out)
    }

    pub async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<CallToolResult, WorkflowError> {
        self.client
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| discovery_error(&self.server, e))
    }

    pub async fn close(self) {
        if let Err(e) = self.client.cancel().await {
            tracing::warn!(server = %self.server.name, error = %e, "tool server did not shut down cleanly");
        }
    }
}

/// Connect, list, disconnect.
pub async fn discover(server: &ToolServer) -> Result<ToolServer, WorkflowError> {
    let session = ToolSession::open(server).await?;
    let listed = session.list_tools().await;
    session.close().await;

    let mut discovered = server.clone();
    discovered.tools = listed?;
    tracing::info!(server = %discovered.name, tools = discovered.tools.len(), "discovered tools");
    Ok(discovered)
}

/// Discover every variant in order, stopping at the first failure.
pub async fn discover_all(variants: &[Variant], command: &str) -> Result<Vec<ToolServer>, WorkflowError> {
    let mut servers = Vec::with_capacity(variants.len());
    for &variant in variants {
        servers.push(discover(&tool_server(variant, command)).await?);
    }
    Ok(servers)
}
