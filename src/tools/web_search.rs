use async_trait::async_trait;
use serde_json::json;

use crate::clients::duckduckgo::{DuckDuckGo, SearchHit};
use crate::core::{Tool, ToolError, ToolOutput, ToolSpec};
use crate::tools::args::{optional_u64, required_nonblank};

pub const MAX_SEARCH_RESULTS: u64 = 25;

#[derive(Clone)]
pub struct WebSearch {
    client: DuckDuckGo,
}

impl WebSearch {
    pub fn new(client: DuckDuckGo) -> Self { Self { client } }
}

impl ToolSpec for WebSearch {
    fn name(&self) -> &'static str { "web_search" }
    fn description(&self) -> &'static str { "Search the web for information" }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "max_results": {"type": "integer", "description": "Maximum number of results", "default": 5}
            },
            "required": ["query"]
        })
    }
}

fn render(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for '{query}'");
    }
    let mut text = format!("Search results for '{query}' (showing {} results):\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        text.push_str(&format!("\n{}. {}\n", i + 1, hit.title));
        if !hit.url.is_empty() {
            text.push_str(&format!("   URL: {}\n", hit.url));
        }
        text.push_str(&format!("   Description: {}\n", hit.snippet));
    }
    text
}

#[async_trait]
impl Tool for WebSearch {
    async fn call(&self, args: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = required_nonblank(args, "query")?;
        let max_results = optional_u64(args, "max_results", 5, 1, MAX_SEARCH_RESULTS)?;
        let hits = self
            .client
            .search(query, max_results as usize)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;
        Ok(ToolOutput::text(render(query, &hits)).with_structured(json!({
            "query": query,
            "results": hits,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn renders_numbered_hits() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/").query_param("q", "tokio");
            then.status(200).json_body(json!({
                "Heading": "Tokio",
                "AbstractText": "An asynchronous runtime for Rust.",
                "AbstractURL": "https://tokio.rs",
                "RelatedTopics": []
            }));
        });
        let tool = WebSearch::new(DuckDuckGo::new(server.base_url()).unwrap());
        let out = tool.call(&json!({"query": "tokio"})).await.unwrap();
        assert!(out.text.starts_with("Search results for 'tokio' (showing 1 results):"));
        assert!(out.text.contains("1. Tokio\n   URL: https://tokio.rs\n"));
        assert_eq!(out.structured.unwrap()["results"][0]["url"], "https://tokio.rs");
    }

    #[tokio::test]
    async fn upstream_failure_is_a_search_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(404);
        });
        let tool = WebSearch::new(DuckDuckGo::new(server.base_url()).unwrap());
        let err = tool.call(&json!({"query": "x"})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().starts_with("Search error:"));
    }

    #[tokio::test]
    async fn validates_arguments_before_any_request() {
        let tool = WebSearch::new(DuckDuckGo::new("http://127.0.0.1:9").unwrap());
        let err = tool.call(&json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        let err = tool.call(&json!({"query": "x", "max_results": 100})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_results_are_reported() {
        assert_eq!(render("nothing", &[]), "No results found for 'nothing'");
    }
}
