use serde::Serialize;
use thiserror::Error;

/// Coarse failure category carried by every [`ToolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingArgument,
    InvalidArgument,
    NotFound,
    Io,
    Timeout,
    UnknownTool,
    Evaluation,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingArgument => "missing_argument",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Io => "io",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::Evaluation => "evaluation",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single tool invocation. The rendered message always starts
/// with a fixed label so it reads well when shown to an agent verbatim.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Error: missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("Error: {0}")]
    InvalidArgument(String),

    #[error("Error: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Error: Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Calculation error: {0}")]
    Evaluation(String),

    #[error("Search error: {0}")]
    Upstream(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::MissingArgument(_) => ErrorKind::MissingArgument,
            ToolError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::Io { .. } => ErrorKind::Io,
            ToolError::Timeout(_) => ErrorKind::Timeout,
            ToolError::UnknownTool(_) => ErrorKind::UnknownTool,
            ToolError::Evaluation(_) => ErrorKind::Evaluation,
            ToolError::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// Wrap an I/O failure; a missing path becomes [`ToolError::NotFound`].
    pub fn io(context: impl Into<String>, path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return ToolError::NotFound(format!("Path '{path}' does not exist"));
        }
        ToolError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors raised while assembling or running a crew workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("API key not configured: set OPENAI_API_KEY (in the environment or .env)")]
    MissingApiKey,

    #[error("failed to start tool server '{server}': {message}")]
    Discovery { server: String, message: String },

    #[error("crew engine failed: {0}")]
    Engine(String),

    #[error("no requirement provided")]
    EmptyRequirement,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_fixed_labels() {
        assert_eq!(
            ToolError::MissingArgument("file_path").to_string(),
            "Error: missing required argument 'file_path'"
        );
        assert_eq!(
            ToolError::Timeout(30).to_string(),
            "Error: Command timed out after 30 seconds"
        );
        assert!(ToolError::Evaluation("division by zero".into())
            .to_string()
            .starts_with("Calculation error:"));
    }

    #[test]
    fn io_not_found_is_reclassified() {
        let err = ToolError::io(
            "Error reading file",
            "missing.txt",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.txt"));

        let err = ToolError::io(
            "Error reading file",
            "locked.txt",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().starts_with("Error reading file: "));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let v = serde_json::to_value(ErrorKind::MissingArgument).unwrap();
        assert_eq!(v, "missing_argument");
        assert_eq!(ErrorKind::UnknownTool.to_string(), "unknown_tool");
    }
}
