use std::fmt::Write as _;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::core::WorkflowError;
use crate::domain::CrewPlan;
use crate::infra::config::Config;
use crate::tools::terminal::shell;

/// Runs a crew plan to completion and returns the final result text.
#[async_trait]
pub trait CrewEngine: Send + Sync {
    async fn kickoff(&self, plan: &CrewPlan) -> Result<String, WorkflowError>;
}

/// Hands the plan, as JSON on stdin, to an external command.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    command: String,
    api_key: String,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>, api_key: Option<&str>) -> Result<Self, WorkflowError> {
        let api_key = api_key.ok_or(WorkflowError::MissingApiKey)?;
        Ok(Self {
            command: command.into(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, WorkflowError> {
        let command = cfg
            .crew_engine_cmd
            .as_deref()
            .ok_or_else(|| WorkflowError::Engine("CREW_ENGINE_CMD is not set (use --dry-run to preview the plan)".into()))?;
        Self::new(command, cfg.api_key())
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl CrewEngine for CommandEngine {
    async fn kickoff(&self, plan: &CrewPlan) -> Result<String, WorkflowError> {
        let payload = serde_json::to_vec(plan)?;
        let mut cmd = shell(&self.command);
        cmd.env("OPENAI_API_KEY", &self.api_key)
            .env("CREW_WORKFLOW", &plan.workflow)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(command = %self.command, workflow = %plan.workflow, "crew kickoff");
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        // runs alongside the output drain; an engine echoing a large plan
        // stalls once its stdout pipe is full
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                Ok(()) => Ok(()),
                // the engine may exit without reading the plan
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("crew engine closed stdin early");
                    Ok(())
                }
                Err(e) => Err(e),
            }
            // stdin drops here, so the engine sees EOF
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        fed?;
        let output = output?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        Err(WorkflowError::Engine(if stderr.is_empty() {
            format!("exit code {code}")
        } else {
            format!("exit code {code}: {stderr}")
        }))
    }
}

/// Describes what would be run without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunEngine;

#[async_trait]
impl CrewEngine for DryRunEngine {
    async fn kickoff(&self, plan: &CrewPlan) -> Result<String, WorkflowError> {
        Ok(render_plan(plan))
    }
}

pub fn render_plan(plan: &CrewPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Workflow: {} ({:?})", plan.workflow, plan.process);
    let _ = writeln!(out, "Requirement: {}", plan.requirement);

    let _ = writeln!(out, "\nAgents:");
    for (i, a) in plan.agents.iter().enumerate() {
        let limit = a.max_iter.map(|n| format!("max_iter {n}")).unwrap_or_else(|| "default iterations".into());
        let delegation = if a.allow_delegation { ", may delegate" } else { "" };
        let _ = writeln!(out, "  {}. {} ({limit}{delegation}), {} tools", i + 1, a.role, a.tools.len());
        let _ = writeln!(out, "     Goal: {}", a.goal);
    }

    let _ = writeln!(out, "\nTasks:");
    for (i, t) in plan.tasks.iter().enumerate() {
        let headline = t
            .description
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        let _ = writeln!(out, "  {}. [{}] {}", i + 1, t.agent_role, headline);
        let _ = writeln!(out, "     Expected: {}", t.expected_output);
    }

    if !plan.tool_servers.is_empty() {
        let _ = writeln!(out, "\nTool servers:");
        for s in &plan.tool_servers {
            let _ = writeln!(out, "  - {} ({} tools): {} {}", s.name, s.tools.len(), s.command, s.args.join(" "));
        }
    }

    let _ = write!(out, "\nArtifacts: {}", plan.artifacts.join(", "));
    out
}
