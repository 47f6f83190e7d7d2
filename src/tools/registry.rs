use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::core::{Tool, ToolDescriptor, ToolError, ToolOutput};

/// Tools of one server, addressable by name and listed in declaration order.
#[derive(Clone)]
pub struct ToolRegistry {
    by_name: Arc<HashMap<&'static str, Arc<dyn Tool>>>,
    order: Arc<Vec<&'static str>>,
}

impl ToolRegistry {
    /// A later tool with an already registered name replaces the earlier
    /// one but keeps its position.
    pub fn with_tools<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        let mut map: HashMap<&'static str, Arc<dyn Tool>> = HashMap::new();
        let mut order = Vec::new();
        for t in iter {
            if map.insert(t.name(), t.clone()).is_none() {
                order.push(t.name());
            }
        }
        Self { by_name: Arc::new(map), order: Arc::new(order) }
    }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn contains(&self, name: &str) -> bool { self.by_name.contains_key(name) }

    pub fn names(&self) -> Vec<&'static str> { self.order.to_vec() }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.by_name.get(name))
            .map(|t| t.descriptor())
            .collect()
    }

    pub async fn call(&self, name: &str, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let t = self
            .by_name
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let start = Instant::now();
        let res = t.call(args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let outcome = match &res {
            Ok(_) => {
                tracing::info!(tool = name, elapsed_ms, "tool call succeeded");
                "ok"
            }
            Err(e) => {
                tracing::warn!(tool = name, kind = %e.kind(), elapsed_ms, error = %e, "tool call failed");
                e.kind().as_str()
            }
        };
        metrics::counter!("tool_calls_total", "tool" => name.to_string(), "outcome" => outcome).increment(1);
        res
    }
}
