//! The four tool servers this binary can run, and the registry each one serves.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clients::duckduckgo::{DuckDuckGo, DEFAULT_SEARCH_BASE_URL};
use crate::core::{Tool, ToolError};
use crate::tools::calculate::Calculate;
use crate::tools::clock::CurrentTime;
use crate::tools::fs::{
    AppendToFile, CopyFile, CreateDirectory, DeleteFile, GetFileInfo, ListFiles, MoveFile, PathArg,
    ReadFile, SearchFiles, WriteFile,
};
use crate::tools::registry::ToolRegistry;
use crate::tools::terminal::{CheckCommandExists, ExecuteCommand, GetEnvironmentVariable, ListDirectory};
use crate::tools::web_search::WebSearch;
use crate::tools::workspace::{PathPolicy, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Filesystem,
    Terminal,
    Simple,
    Sample,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Filesystem, Variant::Terminal, Variant::Simple, Variant::Sample];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Filesystem => "filesystem",
            Variant::Terminal => "terminal",
            Variant::Simple => "simple",
            Variant::Sample => "sample",
        }
    }

    /// Name reported in the MCP `initialize` handshake.
    pub fn server_name(self) -> &'static str {
        match self {
            Variant::Filesystem => "filesystem-mcp-server",
            Variant::Terminal => "terminal-mcp-server",
            Variant::Simple => "simple-tools-server",
            Variant::Sample => "sample-tools-server",
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            Variant::Filesystem => "File and directory operations: read, write, append, list, copy, move, delete, inspect and search.",
            Variant::Terminal => "Run shell commands and inspect the local environment.",
            Variant::Simple => "Basic utilities: current time, calculator and file read/write in the workspace directory.",
            Variant::Sample => "Sample tools: web search, calculator, current time and file read/write in the workspace directory.",
        }
    }

    pub fn path_policy(self) -> PathPolicy {
        match self {
            Variant::Filesystem | Variant::Terminal => PathPolicy::Unrestricted,
            Variant::Simple | Variant::Sample => PathPolicy::BaseName,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tools variant '{s}' (expected filesystem, terminal, simple or sample)"))
    }
}

/// Process-wide knobs the tools are built with.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub root: PathBuf,
    pub command_timeout_secs: u64,
    pub search_base_url: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            command_timeout_secs: 30,
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
        }
    }
}

pub fn build_registry(variant: Variant, settings: &ToolSettings) -> Result<ToolRegistry, ToolError> {
    let ws = Workspace::new(settings.root.clone(), variant.path_policy());
    let tools: Vec<Arc<dyn Tool>> = match variant {
        Variant::Simple => vec![
            Arc::new(CurrentTime),
            Arc::new(Calculate),
            Arc::new(WriteFile::new(ws.clone(), PathArg::Filename)),
            Arc::new(ReadFile::new(ws, PathArg::Filename)),
        ],
        Variant::Sample => {
            let client = DuckDuckGo::new(settings.search_base_url.clone())
                .map_err(|e| ToolError::Upstream(e.to_string()))?;
            vec![
                Arc::new(WebSearch::new(client)),
                Arc::new(WriteFile::new(ws.clone(), PathArg::Filename)),
                Arc::new(ReadFile::new(ws, PathArg::Filename)),
                Arc::new(Calculate),
                Arc::new(CurrentTime),
            ]
        }
        Variant::Filesystem => vec![
            Arc::new(ReadFile::new(ws.clone(), PathArg::FilePath)),
            Arc::new(WriteFile::new(ws.clone(), PathArg::FilePath)),
            Arc::new(AppendToFile::new(ws.clone())),
            Arc::new(CreateDirectory::new(ws.clone())),
            Arc::new(ListFiles::new(ws.clone())),
            Arc::new(CopyFile::new(ws.clone())),
            Arc::new(MoveFile::new(ws.clone())),
            Arc::new(DeleteFile::new(ws.clone())),
            Arc::new(GetFileInfo::new(ws.clone())),
            Arc::new(SearchFiles::new(ws)),
        ],
        Variant::Terminal => vec![
            Arc::new(ExecuteCommand::new(ws.clone(), settings.command_timeout_secs)),
            Arc::new(ListDirectory::new(ws)),
            Arc::new(CheckCommandExists),
            Arc::new(GetEnvironmentVariable),
        ],
    };
    Ok(ToolRegistry::with_tools(tools))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(root: &std::path::Path) -> ToolSettings {
        ToolSettings { root: root.to_path_buf(), ..ToolSettings::default() }
    }

    #[test]
    fn every_variant_declares_its_tools_in_order() {
        let s = ToolSettings::default();
        let names = |v| build_registry(v, &s).unwrap().names();
        assert_eq!(names(Variant::Simple), vec!["get_current_time", "calculate", "write_file", "read_file"]);
        assert_eq!(
            names(Variant::Sample),
            vec!["web_search", "write_file", "read_file", "calculate", "get_current_time"]
        );
        assert_eq!(names(Variant::Filesystem).len(), 10);
        assert_eq!(
            names(Variant::Terminal),
            vec!["execute_command", "list_directory", "check_command_exists", "get_environment_variable"]
        );
    }

    #[test]
    fn descriptors_declare_required_arguments() {
        let reg = build_registry(Variant::Filesystem, &ToolSettings::default()).unwrap();
        let write = reg.list().into_iter().find(|d| d.name == "write_file").unwrap();
        assert_eq!(write.required_arguments(), vec!["file_path", "content"]);
        assert_eq!(write.input_schema["properties"]["create_directories"]["default"], true);

        let reg = build_registry(Variant::Simple, &ToolSettings::default()).unwrap();
        let read = reg.list().into_iter().find(|d| d.name == "read_file").unwrap();
        assert_eq!(read.required_arguments(), vec!["filename"]);
    }

    #[test]
    fn parses_variant_names() {
        assert_eq!("Terminal".parse::<Variant>().unwrap(), Variant::Terminal);
        assert!("nope".parse::<Variant>().is_err());
        assert_eq!(Variant::Simple.server_name(), "simple-tools-server");
    }

    #[tokio::test]
    async fn simple_variant_round_trips_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let reg = build_registry(Variant::Simple, &settings(dir.path())).unwrap();
        reg.call("write_file", &json!({"filename": "note.txt", "content": "hi"}))
            .await
            .unwrap();
        let out = reg.call("read_file", &json!({"filename": "note.txt"})).await.unwrap();
        assert_eq!(out.text, "Content of 'note.txt':\n\nhi");
        let out = reg.call("calculate", &json!({"expression": "2+2"})).await.unwrap();
        assert!(out.text.contains('4'));
    }
}
