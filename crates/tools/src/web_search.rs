//! Web search tool: Google Custom Search JSON API.
//!
//! Needs `GOOGLE_API_KEY` and `GOOGLE_SEARCH_ENGINE_ID`. Without them the
//! tool still registers, so the Reasoner can see it, but every invocation
//! fails with an explanatory error that the loop records as an observation.

use async_trait::async_trait;
use intentus_core::error::ToolError;
use intentus_core::tool::{Tool, ToolResult};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const TOOL_NAME: &str = "web_search";
const MAX_RESULTS: u64 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct WebSearchTool {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    engine_id: Option<String>,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(tool = TOOL_NAME, error = %e, "HTTP client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            api_url: "https://www.googleapis.com/customsearch/v1".into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            engine_id: engine_id.filter(|k| !k.is_empty()),
        }
    }

    /// Read credentials from `GOOGLE_API_KEY` / `GOOGLE_SEARCH_ENGINE_ID`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("GOOGLE_API_KEY").ok(),
            std::env::var("GOOGLE_SEARCH_ENGINE_ID").ok(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }

    /// The timeout is set per request so it survives a defaulted client.
    fn request(&self, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .query(params)
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: TOOL_NAME.into(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SearchHit {
    title: String,
    link: String,
    snippet: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a list of results with titles, links, \
         and snippets."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5, max 10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "results": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "link": { "type": "string" },
                            "snippet": { "type": "string" }
                        }
                    }
                }
            }
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let num_results = arguments["num_results"]
            .as_u64()
            .unwrap_or(5)
            .clamp(1, MAX_RESULTS)
            .to_string();

        let (Some(api_key), Some(engine_id)) = (&self.api_key, &self.engine_id) else {
            return Err(failed(
                "web search is not configured (set GOOGLE_API_KEY and GOOGLE_SEARCH_ENGINE_ID)",
            ));
        };

        debug!(query, "Searching the web");

        let response = self
            .request(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query),
                ("num", num_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable response: {e}")))?;

        let hits = parse_results(&body);
        if hits.is_empty() {
            return Ok(ToolResult::ok(
                format!("No results found for query: {query}"),
                Some(serde_json::json!({ "results": [] })),
            ));
        }

        Ok(ToolResult::ok(
            render(&hits),
            Some(serde_json::json!({ "results": hits })),
        ))
    }
}

/// Hits from a Custom Search response, in rank order.
fn parse_results(body: &serde_json::Value) -> Vec<SearchHit> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(SearchHit {
                        title: item["title"].as_str()?.to_string(),
                        link: item["link"].as_str()?.to_string(),
                        snippet: item["snippet"].as_str().unwrap_or_default().trim().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn render(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("{}. {}\n   {}\n   {}", i + 1, h.title, h.link, h.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
