//! Records handed to the crew engine: who the agents are, what they must do,
//! and which tool servers they may reach.

use serde::{Deserialize, Serialize};

use crate::core::ToolDescriptor;
use crate::tools::Variant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Tool names the agent may call; filled in after discovery.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<u32>,
    #[serde(default)]
    pub allow_delegation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPrompt {
    pub description: String,
    pub expected_output: String,
    /// Role of the [`AgentProfile`] that executes this task.
    pub agent_role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    #[default]
    Sequential,
}

/// A stdio tool server and the descriptors it advertised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServer {
    pub name: String,
    pub variant: Variant,
    pub command: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl ToolServer {
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewPlan {
    pub workflow: String,
    #[serde(default)]
    pub process: Process,
    pub requirement: String,
    pub agents: Vec<AgentProfile>,
    pub tasks: Vec<TaskPrompt>,
    #[serde(default)]
    pub tool_servers: Vec<ToolServer>,
    /// Files the agents are expected to leave behind.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl CrewPlan {
    pub fn agent(&self, role: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.role == role)
    }

    /// Attach the discovered servers and give every agent all of their tools.
    pub fn attach_tool_servers(&mut self, servers: Vec<ToolServer>) {
        let mut names: Vec<String> = Vec::new();
        for server in &servers {
            for name in server.tool_names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        for agent in &mut self.agents {
            agent.tools = names.clone();
        }
        self.tool_servers = servers;
    }

    /// Every task must name an agent that exists in the plan.
    pub fn unassigned_tasks(&self) -> Vec<&TaskPrompt> {
        self.tasks
            .iter()
            .filter(|t| self.agent(&t.agent_role).is_none())
            .collect()
    }
}
