//! File tools. `read_file`/`write_file` are shared by every variant that
//! exposes them; the remaining tools belong to the `filesystem` variant.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use ignore::WalkBuilder;
use serde_json::json;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::{Tool, ToolError, ToolOutput, ToolSpec};
use crate::tools::args::{optional_bool, optional_str, required_nonblank, required_str};
use crate::tools::pattern::wildcard_match;
use crate::tools::workspace::Workspace;

/// Name of the path argument of `read_file`/`write_file`; the small
/// variants call it `filename`, the filesystem server `file_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathArg {
    Filename,
    FilePath,
}

impl PathArg {
    pub fn key(self) -> &'static str {
        match self {
            PathArg::Filename => "filename",
            PathArg::FilePath => "file_path",
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn join_err(e: tokio::task::JoinError) -> ToolError {
    ToolError::Io {
        context: "Error walking directory".into(),
        source: std::io::Error::other(e),
    }
}

/// Metadata of an existing path, or `not_found` naming it as `what`.
async fn existing(path: &Path, shown: &str, what: &str, context: &str) -> Result<std::fs::Metadata, ToolError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ToolError::NotFound(format!("{what} '{shown}' does not exist")))
        }
        Err(e) => Err(ToolError::io(context, shown, e)),
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl DirEntryInfo {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "type": if self.is_dir { "directory" } else { "file" },
            "size": self.size,
        })
    }
}

/// Entries of `dir` sorted by name, dot-files dropped unless `show_hidden`.
pub(crate) async fn read_dir_sorted(dir: &Path, show_hidden: bool) -> std::io::Result<Vec<DirEntryInfo>> {
    let mut rd = fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = rd.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        // Follow symlinks; a dangling one is listed as an empty file.
        let (is_dir, size) = match fs::metadata(entry.path()).await {
            Ok(meta) => (meta.is_dir(), if meta.is_dir() { 0 } else { meta.len() }),
            Err(_) => (false, 0),
        };
        out.push(DirEntryInfo { name, is_dir, size });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

#[derive(Clone)]
pub struct ReadFile {
    ws: Workspace,
    arg: PathArg,
}

impl ReadFile {
    pub fn new(ws: Workspace, arg: PathArg) -> Self { Self { ws, arg } }
}

impl ToolSpec for ReadFile {
    fn name(&self) -> &'static str { "read_file" }
    fn description(&self) -> &'static str { "Read the contents of a file" }
    fn input_schema(&self) -> serde_json::Value {
        let key = self.arg.key();
        json!({
            "type": "object",
            "properties": { key: {"type": "string", "description": "Path of the file to read"} },
            "required": [key]
        })
    }
}

#[async_trait]
impl Tool for ReadFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, self.arg.key())?;
        let path = self.ws.resolve(raw)?;
        let shown = self.ws.display(raw, &path);
        let meta = existing(&path, &shown, "File", "Error reading file").await?;
        if !meta.is_file() {
            return Err(ToolError::InvalidArgument(format!("'{shown}' is not a file")));
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io("Error reading file", &shown, e))?;
        let structured = json!({
            "path": absolute(&path).display().to_string(),
            "content": content,
            "bytes": meta.len(),
        });
        Ok(ToolOutput::text(format!("Content of '{shown}':\n\n{content}")).with_structured(structured))
    }
}

#[derive(Clone)]
pub struct WriteFile {
    ws: Workspace,
    arg: PathArg,
}

impl WriteFile {
    pub fn new(ws: Workspace, arg: PathArg) -> Self { Self { ws, arg } }
}

impl ToolSpec for WriteFile {
    fn name(&self) -> &'static str { "write_file" }
    fn description(&self) -> &'static str { "Write content to a file, replacing any previous content" }
    fn input_schema(&self) -> serde_json::Value {
        let key = self.arg.key();
        let mut schema = json!({
            "type": "object",
            "properties": {
                key: {"type": "string", "description": "Path of the file to write"},
                "content": {"type": "string", "description": "Content to write to the file"}
            },
            "required": [key, "content"]
        });
        if self.arg == PathArg::FilePath {
            schema["properties"]["create_directories"] = json!({
                "type": "boolean",
                "description": "Create parent directories if they don't exist",
                "default": true
            });
        }
        schema
    }
}

#[async_trait]
impl Tool for WriteFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, self.arg.key())?;
        let content = required_str(args, "content")?;
        let create_dirs = optional_bool(args, "create_directories", true)?;
        let path = self.ws.resolve(raw)?;
        let shown = self.ws.display(raw, &path);
        if create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ToolError::io("Error writing file", &shown, e))?;
            }
        }
        fs::write(&path, content)
            .await
            .map_err(|e| ToolError::io("Error writing file", &shown, e))?;
        let chars = content.chars().count();
        tracing::debug!(path = %path.display(), chars, "file written");
        Ok(ToolOutput::text(format!("Successfully wrote {chars} characters to '{shown}'"))
            .with_structured(json!({"path": absolute(&path).display().to_string(), "characters": chars})))
    }
}

#[derive(Clone)]
pub struct AppendToFile {
    ws: Workspace,
}

impl AppendToFile {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for AppendToFile {
    fn name(&self) -> &'static str { "append_to_file" }
    fn description(&self) -> &'static str { "Append content to a file, creating it if needed" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Path to the file to append to"},
                "content": {"type": "string", "description": "Content to append to the file"}
            },
            "required": ["file_path", "content"]
        })
    }
}

#[async_trait]
impl Tool for AppendToFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, "file_path")?;
        let content = required_str(args, "content")?;
        let path = self.ws.resolve(raw)?;
        let shown = self.ws.display(raw, &path);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ToolError::io("Error appending to file", &shown, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ToolError::io("Error appending to file", &shown, e))?;
        file.flush()
            .await
            .map_err(|e| ToolError::io("Error appending to file", &shown, e))?;
        let chars = content.chars().count();
        Ok(ToolOutput::text(format!("Successfully appended {chars} characters to '{shown}'"))
            .with_structured(json!({"path": absolute(&path).display().to_string(), "characters": chars})))
    }
}

#[derive(Clone)]
pub struct CreateDirectory {
    ws: Workspace,
}

impl CreateDirectory {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for CreateDirectory {
    fn name(&self) -> &'static str { "create_directory" }
    fn description(&self) -> &'static str { "Create a directory (and parent directories if needed)" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory_path": {"type": "string", "description": "Path to the directory to create"}
            },
            "required": ["directory_path"]
        })
    }
}

#[async_trait]
impl Tool for CreateDirectory {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, "directory_path")?;
        let path = self.ws.resolve(raw)?;
        let shown = self.ws.display(raw, &path);
        fs::create_dir_all(&path)
            .await
            .map_err(|e| ToolError::io("Error creating directory", &shown, e))?;
        Ok(ToolOutput::text(format!("Successfully created directory '{shown}'"))
            .with_structured(json!({"path": absolute(&path).display().to_string()})))
    }
}

#[derive(Clone)]
pub struct ListFiles {
    ws: Workspace,
}

impl ListFiles {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for ListFiles {
    fn name(&self) -> &'static str { "list_files" }
    fn description(&self) -> &'static str { "List files and directories in a path with sizes" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory_path": {"type": "string", "description": "Path to the directory to list", "default": "."},
                "recursive": {"type": "boolean", "description": "List files recursively", "default": false},
                "show_hidden": {"type": "boolean", "description": "Show hidden files and directories", "default": false}
            }
        })
    }
}

/// Walk `root` depth-first in name order, rendering an indented tree.
fn render_tree(root: &Path, show_hidden: bool) -> (Vec<String>, Vec<serde_json::Value>) {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(!show_hidden)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    let mut lines = Vec::new();
    let mut entries = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let indent = "  ".repeat(entry.depth());
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if is_dir {
            lines.push(format!("{indent}📁 {name}/"));
        } else {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            lines.push(format!("{indent}📄 {name} ({size} bytes)"));
        }
        if entry.depth() > 0 {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            entries.push(json!({
                "path": rel.display().to_string(),
                "type": if is_dir { "directory" } else { "file" },
            }));
        }
    }
    (lines, entries)
}

#[async_trait]
impl Tool for ListFiles {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = optional_str(args, "directory_path", ".");
        let recursive = optional_bool(args, "recursive", false)?;
        let show_hidden = optional_bool(args, "show_hidden", false)?;
        let path = self.ws.resolve(raw)?;
        let meta = existing(&path, raw, "Directory", "Error listing files").await?;
        if !meta.is_dir() {
            return Err(ToolError::InvalidArgument(format!("'{raw}' is not a directory")));
        }

        let (lines, entries) = if recursive {
            let root = path.clone();
            tokio::task::spawn_blocking(move || render_tree(&root, show_hidden))
                .await
                .map_err(join_err)?
        } else {
            let listed = read_dir_sorted(&path, show_hidden)
                .await
                .map_err(|e| ToolError::io("Error listing files", raw, e))?;
            let lines = listed
                .iter()
                .map(|e| if e.is_dir { format!("📁 {}/", e.name) } else { format!("📄 {} ({} bytes)", e.name, e.size) })
                .collect();
            (lines, listed.iter().map(DirEntryInfo::to_json).collect())
        };

        let abs = absolute(&path).display().to_string();
        let mut text = format!("Contents of '{abs}':\n\n");
        if lines.is_empty() {
            text.push_str("(Empty directory)");
        } else {
            text.push_str(&lines.join("\n"));
        }
        Ok(ToolOutput::text(text).with_structured(json!({"path": abs, "entries": entries})))
    }
}

/// Where a copy/move lands: into an existing directory keeps the source name.
async fn destination_for(source: &Path, dest: PathBuf) -> PathBuf {
    match (fs::metadata(&dest).await, source.file_name()) {
        (Ok(meta), Some(name)) if meta.is_dir() => dest.join(name),
        _ => dest,
    }
}

fn transfer_schema(verb: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "source_path": {"type": "string", "description": format!("Path of the file to {verb}")},
            "destination_path": {"type": "string", "description": "Destination path or existing directory"}
        },
        "required": ["source_path", "destination_path"]
    })
}

#[derive(Clone)]
pub struct CopyFile {
    ws: Workspace,
}

impl CopyFile {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for CopyFile {
    fn name(&self) -> &'static str { "copy_file" }
    fn description(&self) -> &'static str { "Copy a file to another location" }
    fn input_schema(&self) -> serde_json::Value { transfer_schema("copy") }
}

#[async_trait]
impl Tool for CopyFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let src_raw = required_nonblank(args, "source_path")?;
        let dst_raw = required_nonblank(args, "destination_path")?;
        let src = self.ws.resolve(src_raw)?;
        let meta = existing(&src, src_raw, "Path", "Error copying file").await?;
        if meta.is_dir() {
            return Err(ToolError::InvalidArgument(format!(
                "'{src_raw}' is a directory; only files can be copied"
            )));
        }
        let dst = destination_for(&src, self.ws.resolve(dst_raw)?).await;
        let bytes = fs::copy(&src, &dst)
            .await
            .map_err(|e| ToolError::io("Error copying file", dst_raw, e))?;
        let dst_abs = absolute(&dst).display().to_string();
        Ok(ToolOutput::text(format!("Successfully copied '{src_raw}' to '{dst_abs}' ({bytes} bytes)"))
            .with_structured(json!({"source": absolute(&src).display().to_string(), "destination": dst_abs, "bytes": bytes})))
    }
}

#[derive(Clone)]
pub struct MoveFile {
    ws: Workspace,
}

impl MoveFile {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for MoveFile {
    fn name(&self) -> &'static str { "move_file" }
    fn description(&self) -> &'static str { "Move or rename a file or directory" }
    fn input_schema(&self) -> serde_json::Value { transfer_schema("move") }
}

#[async_trait]
impl Tool for MoveFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let src_raw = required_nonblank(args, "source_path")?;
        let dst_raw = required_nonblank(args, "destination_path")?;
        let src = self.ws.resolve(src_raw)?;
        existing(&src, src_raw, "Path", "Error moving file").await?;
        let dst = destination_for(&src, self.ws.resolve(dst_raw)?).await;
        fs::rename(&src, &dst)
            .await
            .map_err(|e| ToolError::io("Error moving file", dst_raw, e))?;
        let dst_abs = absolute(&dst).display().to_string();
        Ok(ToolOutput::text(format!("Successfully moved '{src_raw}' to '{dst_abs}'"))
            .with_structured(json!({"source": absolute(&src).display().to_string(), "destination": dst_abs})))
    }
}

#[derive(Clone)]
pub struct DeleteFile {
    ws: Workspace,
}

impl DeleteFile {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for DeleteFile {
    fn name(&self) -> &'static str { "delete_file" }
    fn description(&self) -> &'static str { "Delete a file or directory" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Path to the file or directory to delete"},
                "recursive": {"type": "boolean", "description": "Delete directories recursively", "default": false}
            },
            "required": ["file_path"]
        })
    }
}

#[async_trait]
impl Tool for DeleteFile {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, "file_path")?;
        let recursive = optional_bool(args, "recursive", false)?;
        let path = self.ws.resolve(raw)?;
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => return Err(ToolError::io("Error deleting path", raw, e)),
        };
        let kind = if meta.is_dir() {
            let removed = if recursive {
                fs::remove_dir_all(&path).await
            } else {
                let mut rd = fs::read_dir(&path)
                    .await
                    .map_err(|e| ToolError::io("Error deleting path", raw, e))?;
                let has_entries = rd
                    .next_entry()
                    .await
                    .map_err(|e| ToolError::io("Error deleting path", raw, e))?
                    .is_some();
                if has_entries {
                    return Err(ToolError::InvalidArgument(format!(
                        "Directory '{raw}' is not empty; set recursive to true to delete it"
                    )));
                }
                fs::remove_dir(&path).await
            };
            removed.map_err(|e| ToolError::io("Error deleting path", raw, e))?;
            "directory"
        } else {
            fs::remove_file(&path)
                .await
                .map_err(|e| ToolError::io("Error deleting path", raw, e))?;
            "file"
        };
        Ok(ToolOutput::text(format!("Successfully deleted {kind} '{raw}'"))
            .with_structured(json!({"path": absolute(&path).display().to_string(), "type": kind})))
    }
}

#[derive(Clone)]
pub struct GetFileInfo {
    ws: Workspace,
}

impl GetFileInfo {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for GetFileInfo {
    fn name(&self) -> &'static str { "get_file_info" }
    fn description(&self) -> &'static str { "Get detailed information about a file or directory" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Path to the file or directory"}
            },
            "required": ["file_path"]
        })
    }
}

fn format_time(t: std::io::Result<std::time::SystemTime>) -> String {
    match t {
        Ok(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => "unavailable".into(),
    }
}

#[cfg(unix)]
fn permissions(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:03o}", meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permissions(meta: &std::fs::Metadata) -> String {
    if meta.permissions().readonly() { "read-only".into() } else { "read-write".into() }
}

#[async_trait]
impl Tool for GetFileInfo {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_nonblank(args, "file_path")?;
        let path = self.ws.resolve(raw)?;
        let meta = existing(&path, raw, "Path", "Error getting file info").await?;
        let abs = absolute(&path).display().to_string();
        let kind = if meta.is_dir() { "Directory" } else { "File" };
        let created = format_time(meta.created());
        let modified = format_time(meta.modified());
        let perms = permissions(&meta);
        let text = format!(
            "File Information for '{abs}':\n\nType: {kind}\nSize: {} bytes\nCreated: {created}\nModified: {modified}\nPermissions: {perms}\n",
            meta.len()
        );
        Ok(ToolOutput::text(text).with_structured(json!({
            "path": abs,
            "type": kind.to_lowercase(),
            "size": meta.len(),
            "created": created,
            "modified": modified,
            "permissions": perms,
        })))
    }
}

#[derive(Clone)]
pub struct SearchFiles {
    ws: Workspace,
}

impl SearchFiles {
    pub fn new(ws: Workspace) -> Self { Self { ws } }
}

impl ToolSpec for SearchFiles {
    fn name(&self) -> &'static str { "search_files" }
    fn description(&self) -> &'static str { "Search for files by name pattern (wildcards * ? [..])" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory_path": {"type": "string", "description": "Directory to search in", "default": "."},
                "pattern": {"type": "string", "description": "File name pattern (supports wildcards)"},
                "recursive": {"type": "boolean", "description": "Search recursively in subdirectories", "default": true}
            },
            "required": ["pattern"]
        })
    }
}

fn search(root: &Path, pattern: &str, recursive: bool) -> Vec<String> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .max_depth(if recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    walker
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .filter(|entry| wildcard_match(pattern, &entry.file_name().to_string_lossy()))
        .map(|entry| {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let mut shown = rel.display().to_string();
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                shown.push('/');
            }
            shown
        })
        .collect()
}

#[async_trait]
impl Tool for SearchFiles {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let pattern = required_nonblank(args, "pattern")?.to_string();
        let raw = optional_str(args, "directory_path", ".");
        let recursive = optional_bool(args, "recursive", true)?;
        let path = self.ws.resolve(raw)?;
        let meta = existing(&path, raw, "Directory", "Error searching files").await?;
        if !meta.is_dir() {
            return Err(ToolError::InvalidArgument(format!("'{raw}' is not a directory")));
        }
        let root = path.clone();
        let pat = pattern.clone();
        let matches = tokio::task::spawn_blocking(move || search(&root, &pat, recursive))
            .await
            .map_err(join_err)?;
        let abs = absolute(&path).display().to_string();
        let text = if matches.is_empty() {
            format!("No files matching '{pattern}' found in '{abs}'")
        } else {
            format!(
                "Found {} match(es) for '{pattern}' in '{abs}':\n\n{}",
                matches.len(),
                matches.join("\n")
            )
        };
        Ok(ToolOutput::text(text).with_structured(json!({"path": abs, "pattern": pattern, "matches": matches})))
    }
}
