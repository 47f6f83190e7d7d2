use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::content::ToolOutput;
use crate::core::error::ToolError;

/// Minimal metadata every tool must expose.
pub trait ToolSpec {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> serde_json::Value;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Tool = ToolSpec + one async action.
#[async_trait]
pub trait Tool: ToolSpec + Send + Sync {
    async fn call(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Operation descriptor as advertised during discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    /// Names listed under the schema's `required` key.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ToolSpec for Echo {
        fn name(&self) -> &'static str {
            "test.echo"
        }
        fn description(&self) -> &'static str {
            "echo tool"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type":"object","properties":{"x":{"type":"integer"}},"required":["x"]})
        }
    }

    #[async_trait]
    impl Tool for Echo {
        async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(args.to_string()).with_structured(args.clone()))
        }
    }

    #[tokio::test]
    async fn it_runs_echo() {
        let t = Echo;
        let out = t.call(&serde_json::json!({"x":1})).await.unwrap();
        assert_eq!(out.structured.unwrap()["x"], 1);
    }

    #[test]
    fn descriptor_reports_required_arguments() {
        let d = Echo.descriptor();
        assert_eq!(d.name, "test.echo");
        assert_eq!(d.required_arguments(), vec!["x"]);
        let wire = serde_json::to_value(&d).unwrap();
        assert!(wire.get("inputSchema").is_some());
    }
}
