//! Tools of the `terminal` variant: shell execution and environment probes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::core::{Tool, ToolError, ToolOutput, ToolSpec};
use crate::tools::args::{optional_bool, optional_str, optional_u64, required_nonblank};
use crate::tools::fs::read_dir_sorted;
use crate::tools::workspace::Workspace;

pub const MAX_STREAM_CHARS: usize = 20_000;
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Keep at most `max_chars` characters; reports whether anything was cut.
pub fn truncate_text(text: &str, max_chars: usize) -> (String, bool) {
    let mut iter = text.chars();
    let truncated = iter.by_ref().take(max_chars).collect::<String>();
    if iter.next().is_some() {
        (truncated, true)
    } else {
        (text.to_string(), false)
    }
}

pub(crate) fn shell(command: &str) -> Command {
    let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
    let mut cmd = Command::new(program);
    cmd.arg(flag).arg(command);
    cmd
}

#[derive(Clone)]
pub struct ExecuteCommand {
    ws: Workspace,
    default_timeout: u64,
}

impl ExecuteCommand {
    pub fn new(ws: Workspace, default_timeout: u64) -> Self {
        Self { ws, default_timeout: default_timeout.clamp(1, MAX_TIMEOUT_SECS) }
    }
}

impl ToolSpec for ExecuteCommand {
    fn name(&self) -> &'static str { "execute_command" }
    fn description(&self) -> &'static str { "Execute a shell command and return stdout, stderr and the exit code" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The shell command to execute"},
                "working_directory": {"type": "string", "description": "Working directory for the command", "default": "."},
                "timeout": {"type": "integer", "description": "Timeout in seconds", "default": self.default_timeout}
            },
            "required": ["command"]
        })
    }
}

#[async_trait]
impl Tool for ExecuteCommand {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = required_nonblank(args, "command")?;
        let wd_raw = optional_str(args, "working_directory", ".");
        let timeout_secs = optional_u64(args, "timeout", self.default_timeout, 1, MAX_TIMEOUT_SECS)?;
        let wd = self.ws.resolve(wd_raw)?;
        if !tokio::fs::metadata(&wd).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(ToolError::NotFound(format!("Working directory '{wd_raw}' does not exist")));
        }
        let wd_abs = std::path::absolute(&wd).unwrap_or_else(|_| wd.clone());

        let started = Instant::now();
        let mut cmd = shell(command);
        cmd.current_dir(&wd)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        let child = cmd.output();
        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::Io { context: "Error executing command".into(), source: e })
            }
            Err(_) => {
                tracing::warn!(command, timeout_secs, "command timed out");
                return Err(ToolError::Timeout(timeout_secs));
            }
        };
        let exit_code = output.status.code().unwrap_or(-1);
        let (stdout, stdout_truncated) =
            truncate_text(&String::from_utf8_lossy(&output.stdout), MAX_STREAM_CHARS);
        let (stderr, stderr_truncated) =
            truncate_text(&String::from_utf8_lossy(&output.stderr), MAX_STREAM_CHARS);
        tracing::debug!(
            command,
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );

        let mut text = format!(
            "Command: {command}\nWorking Directory: {}\nExit Code: {exit_code}\n\n",
            wd_abs.display()
        );
        if !stdout.is_empty() {
            let marker = if stdout_truncated { "\n... [output truncated]" } else { "" };
            text.push_str(&format!("STDOUT:\n{stdout}{marker}\n"));
        }
        if !stderr.is_empty() {
            let marker = if stderr_truncated { "\n... [output truncated]" } else { "" };
            text.push_str(&format!("STDERR:\n{stderr}{marker}\n"));
        }
        if output.status.success() {
            text.push_str("\n✅ Command executed successfully");
        } else {
            text.push_str(&format!("\n⚠️ Command failed with exit code {exit_code}"));
        }

        Ok(ToolOutput::text(text).with_structured(json!({
            "command": command,
            "working_directory": wd_abs.display().to_string(),
            "exit_code": exit_code,
            "success": output.status.success(),
            "stdout": stdout,
            "stderr": stderr,
            "stdout_truncated": stdout_truncated,
            "stderr_truncated": stderr_truncated,
        })))
    }
}

#[derive(Clone)]
pub struct ListDirectory {
    ws: Workspace,
}

impl ListDirectory {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for ListDirectory {
    fn name(&self) -> &'static str { "list_directory" }
    fn description(&self) -> &'static str { "List the contents of a directory" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Directory path to list", "default": "."},
                "show_hidden": {"type": "boolean", "description": "Show hidden files", "default": false}
            }
        })
    }
}

#[async_trait]
impl Tool for ListDirectory {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = optional_str(args, "path", ".");
        let show_hidden = optional_bool(args, "show_hidden", false)?;
        let path = self.ws.resolve(raw)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::io("Error listing directory", raw, e))?;
        if !meta.is_dir() {
            return Err(ToolError::InvalidArgument(format!("'{raw}' is not a directory")));
        }
        let mut entries = read_dir_sorted(&path, show_hidden)
            .await
            .map_err(|e| ToolError::io("Error listing directory", raw, e))?;
        // Directories first, then files, each by name.
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

        let abs = std::path::absolute(&path).unwrap_or(path);
        let mut text = format!("Contents of '{}':\n\n", abs.display());
        if entries.is_empty() {
            text.push_str("(Empty directory)");
        } else {
            let lines: Vec<String> = entries
                .iter()
                .map(|e| if e.is_dir { format!("📁 {}/", e.name) } else { format!("📄 {}", e.name) })
                .collect();
            text.push_str(&lines.join("\n"));
        }
        let listed: Vec<_> = entries.iter().map(|e| e.to_json()).collect();
        Ok(ToolOutput::text(text).with_structured(json!({
            "path": abs.display().to_string(),
            "entries": listed,
        })))
    }
}

#[derive(Clone, Default)]
pub struct CheckCommandExists;

impl ToolSpec for CheckCommandExists {
    fn name(&self) -> &'static str { "check_command_exists" }
    fn description(&self) -> &'static str { "Check if a command exists on PATH" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Name of the command to check"}
            },
            "required": ["command"]
        })
    }
}

#[async_trait]
impl Tool for CheckCommandExists {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = required_nonblank(args, "command")?.trim();
        match which::which(command) {
            Ok(found) => Ok(ToolOutput::text(format!(
                "✅ Command '{command}' exists at: {}",
                found.display()
            ))
            .with_structured(json!({"command": command, "exists": true, "path": found.display().to_string()}))),
            Err(_) => Ok(ToolOutput::text(format!("❌ Command '{command}' not found in PATH"))
                .with_structured(json!({"command": command, "exists": false}))),
        }
    }
}

#[derive(Clone, Default)]
pub struct GetEnvironmentVariable;

impl ToolSpec for GetEnvironmentVariable {
    fn name(&self) -> &'static str { "get_environment_variable" }
    fn description(&self) -> &'static str { "Get the value of an environment variable" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "variable_name": {"type": "string", "description": "Name of the environment variable"}
            },
            "required": ["variable_name"]
        })
    }
}

#[async_trait]
impl Tool for GetEnvironmentVariable {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = required_nonblank(args, "variable_name")?;
        if name.contains('=') || name.contains('\0') {
            return Err(ToolError::InvalidArgument(format!("'{name}' is not a valid variable name")));
        }
        match std::env::var_os(name) {
            Some(value) => {
                let value = value.to_string_lossy();
                Ok(ToolOutput::text(format!("Environment variable '{name}': {value}"))
                    .with_structured(json!({"name": name, "set": true, "value": value})))
            }
            None => Ok(ToolOutput::text(format!("Environment variable '{name}' is not set"))
                .with_structured(json!({"name": name, "set": false}))),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::tools::workspace::PathPolicy;

    fn exec(dir: &tempfile::TempDir) -> ExecuteCommand {
        ExecuteCommand::new(Workspace::new(dir.path(), PathPolicy::Unrestricted), 30)
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = exec(&dir).call(&json!({"command": "echo hello"})).await.unwrap();
        assert!(out.text.contains("Exit Code: 0"));
        assert!(out.text.contains("STDOUT:\nhello\n"));
        assert!(out.text.ends_with("Command executed successfully"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_still_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let out = exec(&dir)
            .call(&json!({"command": "echo oops >&2; exit 3"}))
            .await
            .unwrap();
        assert!(out.text.contains("Exit Code: 3"));
        assert!(out.text.contains("STDERR:\noops"));
        assert!(out.text.contains("Command failed with exit code 3"));
        assert_eq!(out.structured.unwrap()["success"], false);
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/marker.txt"), "").unwrap();
        let out = exec(&dir)
            .call(&json!({"command": "ls", "working_directory": "sub"}))
            .await
            .unwrap();
        assert!(out.text.contains("marker.txt"));

        let err = exec(&dir)
            .call(&json!({"command": "ls", "working_directory": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn times_out_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let started = Instant::now();
        let err = exec(&dir)
            .call(&json!({"command": "sleep 10", "timeout": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "Error: Command timed out after 1 seconds");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn rejects_blank_command_and_bad_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let err = exec(&dir).call(&json!({"command": "  "})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        let err = exec(&dir)
            .call(&json!({"command": "true", "timeout": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_text("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_text("abc", 3), ("abc".to_string(), false));
    }

    #[tokio::test]
    async fn lists_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("zdir")).unwrap();
        let out = ListDirectory::new(Workspace::new(dir.path(), PathPolicy::Unrestricted))
            .call(&json!({}))
            .await
            .unwrap();
        assert!(out.text.ends_with("📁 zdir/\n📄 a.txt"));
    }

    #[tokio::test]
    async fn finds_sh_on_path() {
        let out = CheckCommandExists.call(&json!({"command": "sh"})).await.unwrap();
        assert_eq!(out.structured.unwrap()["exists"], true);
        let out = CheckCommandExists
            .call(&json!({"command": "definitely-not-a-real-command-xyz"}))
            .await
            .unwrap();
        assert!(out.text.contains("not found in PATH"));
    }

    #[tokio::test]
    async fn reads_environment_variables() {
        let out = GetEnvironmentVariable
            .call(&json!({"variable_name": "PATH"}))
            .await
            .unwrap();
        assert!(out.text.starts_with("Environment variable 'PATH': "));
        let out = GetEnvironmentVariable
            .call(&json!({"variable_name": "CREW_MCP_SURELY_UNSET_VAR"}))
            .await
            .unwrap();
        assert!(out.text.ends_with("is not set"));
    }
}
