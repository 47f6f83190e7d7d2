use std::time::Instant;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infra::http::headers::{add_standard_headers, generate_request_id};
use crate::infra::logging::log_metric;
use crate::infra::runtime::limits::{make_http_client, retry_async};

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.duckduckgo.com";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("retryable status {0}")]
    Retryable(u16),
    #[error("upstream status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl SearchError {
    fn is_retryable(&self) -> bool {
        matches!(self, SearchError::Transport(_) | SearchError::Retryable(_))
    }
}

/// One flattened search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Client for the DuckDuckGo Instant Answer API.
#[derive(Clone)]
pub struct DuckDuckGo {
    base: String,
    http: Client,
    retries: u32,
}

impl DuckDuckGo {
    pub fn new(base: impl Into<String>) -> Result<Self, SearchError> {
        Ok(Self {
            base: base.into(),
            http: make_http_client()?,
            retries: 2,
        })
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/", self.base.trim_end_matches('/'));
        tracing::debug!(endpoint = %url, query, "duckduckgo.search request");
        let http = self.http.clone();
        let req_id = generate_request_id();
        let start = Instant::now();
        let res: Result<InstantAnswerWire, SearchError> =
            retry_async(self.retries, SearchError::is_retryable, move |_| {
                let http = http.clone();
                let url = url.clone();
                let req_id = req_id.clone();
                async move {
                    let (builder, _rid) = add_standard_headers(http.get(url), Some(req_id));
                    let resp = builder
                        .query(&[
                            ("q", query),
                            ("format", "json"),
                            ("no_html", "1"),
                            ("skip_disambig", "1"),
                        ])
                        .send()
                        .await
                        .map_err(|e| SearchError::Transport(e.to_string()))?;
                    let status = resp.status();
                    if status.is_server_error() {
                        return Err(SearchError::Retryable(status.as_u16()));
                    }
                    if !status.is_success() {
                        return Err(SearchError::Status(status.as_u16()));
                    }
                    // The API labels its JSON as javascript, so decode the bytes directly.
                    let body = resp
                        .bytes()
                        .await
                        .map_err(|e| SearchError::Transport(e.to_string()))?;
                    serde_json::from_slice::<InstantAnswerWire>(&body)
                        .map_err(|e| SearchError::Decode(e.to_string()))
                }
            })
            .await;
        if res.is_err() {
            log_metric("web_search", "search_error_total", 1.0);
        }
        let answer = res?;
        log_metric("web_search", "search_latency_ms", start.elapsed().as_millis() as f64);
        Ok(answer.into_hits(max_results))
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswerWire {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    // Usually a string, occasionally an object for calculator-style answers.
    #[serde(rename = "Answer", default)]
    answer: serde_json::Value,
    #[serde(rename = "Definition", default)]
    definition: String,
    #[serde(rename = "DefinitionURL", default)]
    definition_url: String,
    #[serde(rename = "Results", default)]
    results: Vec<TopicWire>,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<TopicWire>,
}

// A group has no text of its own, so it must be tried first: every
// topic-shaped object would also satisfy the all-default `Topic` arm.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopicWire {
    Group {
        #[serde(rename = "Name", default)]
        name: String,
        #[serde(rename = "Topics")]
        topics: Vec<TopicWire>,
    },
    Topic {
        #[serde(rename = "Text", default)]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
}

fn title_of(text: &str) -> String {
    text.split(" - ").next().unwrap_or(text).trim().to_string()
}

impl TopicWire {
    fn flatten_into(self, out: &mut Vec<SearchHit>) {
        match self {
            TopicWire::Topic { text, first_url } => {
                if !text.is_empty() {
                    out.push(SearchHit { title: title_of(&text), url: first_url, snippet: text });
                }
            }
            TopicWire::Group { name, topics } => {
                tracing::trace!(group = %name, "flattening topic group");
                for topic in topics {
                    topic.flatten_into(out);
                }
            }
        }
    }
}

impl InstantAnswerWire {
    fn into_hits(self, max_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading.clone(),
                url: self.abstract_url,
                snippet: self.abstract_text,
            });
        }
        if let Some(answer) = self.answer.as_str().filter(|a| !a.is_empty()) {
            hits.push(SearchHit {
                title: format!("Answer: {}", self.heading),
                url: String::new(),
                snippet: answer.to_string(),
            });
        }
        if !self.definition.is_empty() {
            hits.push(SearchHit {
                title: format!("Definition: {}", self.heading),
                url: self.definition_url,
                snippet: self.definition,
            });
        }
        for topic in self.results.into_iter().chain(self.related_topics) {
            topic.flatten_into(&mut hits);
        }
        hits.truncate(max_results);
        hits
    }
}
