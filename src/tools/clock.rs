use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde_json::json;

use crate::core::{Tool, ToolError, ToolOutput, ToolSpec};
use crate::tools::args::optional_str;

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Default)]
pub struct CurrentTime;

impl ToolSpec for CurrentTime {
    fn name(&self) -> &'static str { "get_current_time" }
    fn description(&self) -> &'static str { "Get the current local date and time" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "format": {"type": "string", "description": "strftime-style format string", "default": DEFAULT_TIME_FORMAT}
            }
        })
    }
}

#[async_trait]
impl Tool for CurrentTime {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let format = optional_str(args, "format", DEFAULT_TIME_FORMAT);
        // chrono panics while rendering an invalid specifier, so parse first.
        let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(ToolError::InvalidArgument(format!("invalid time format '{format}'")));
        }
        let now = Local::now();
        let rendered = now.format_with_items(items.iter()).to_string();
        Ok(ToolOutput::text(format!("Current time: {rendered}")).with_structured(json!({
            "time": rendered,
            "format": format,
            "iso8601": now.to_rfc3339(),
        })))
    }
}
