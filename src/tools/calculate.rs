use async_trait::async_trait;
use serde_json::json;

use crate::core::{Tool, ToolError, ToolOutput, ToolSpec};
use crate::tools::args::required_nonblank;
use crate::tools::expr::{self, Number};

#[derive(Clone, Default)]
pub struct Calculate;

impl ToolSpec for Calculate {
    fn name(&self) -> &'static str { "calculate" }
    fn description(&self) -> &'static str {
        "Perform basic mathematical calculations (+ - * / // % **, parentheses, math functions such as sqrt, log, sin, round)"
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {"type": "string", "description": "Mathematical expression to evaluate (e.g. '2 + 2', 'sqrt(16)')"}
            },
            "required": ["expression"]
        })
    }
}

#[async_trait]
impl Tool for Calculate {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let expression = required_nonblank(args, "expression")?;
        let value = expr::evaluate(expression).map_err(|e| ToolError::Evaluation(e.to_string()))?;
        let structured = match value {
            Number::Int(i) => json!({"expression": expression, "result": i}),
            Number::Float(f) if f.is_finite() => json!({"expression": expression, "result": f}),
            Number::Float(_) => json!({"expression": expression, "result": value.to_string()}),
            Number::Bool(b) => json!({"expression": expression, "result": b}),
        };
        Ok(ToolOutput::text(format!("Result: {expression} = {value}")).with_structured(structured))
    }
}
