//! Successful tool payloads.

use serde_json::Value as JsonValue;

/// Result of a successful invocation: the human-readable text every MCP
/// client shows, plus optional JSON for `structuredContent`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<JsonValue>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }

    pub fn with_structured(mut self, value: JsonValue) -> Self {
        self.structured = Some(value);
        self
    }
}
