//! Wikipedia search tool: keyword lookup against the MediaWiki API.
//!
//! Searches for the keyword, then fetches the plain-text extract of the top
//! hit, truncated to `max_length` characters. Input should be a keyword or
//! short term ("Paris", "French Revolution"), not a full question.

use async_trait::async_trait;
use intentus_core::error::ToolError;
use intentus_core::tool::{Tool, ToolResult};
use std::time::Duration;
use tracing::{debug, warn};

const TOOL_NAME: &str = "wikipedia_search";
const DEFAULT_MAX_LENGTH: usize = 2000;
const SEARCH_LIMIT: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = concat!("intentus/", env!("CARGO_PKG_VERSION"));

pub struct WikipediaSearchTool {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaSearchTool {
    pub fn new() -> Self {
        Self::with_api_url("https://en.wikipedia.org/w/api.php")
    }

    /// Point the tool at another MediaWiki installation.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(tool = TOOL_NAME, error = %e, "HTTP client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    /// MediaWiki asks for an identifying user agent; both it and the timeout
    /// are set per request so they survive a defaulted client.
    fn request(&self, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(params)
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<serde_json::Value, ToolError> {
        let response = self
            .request(params)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable response: {e}")))
    }
}

impl Default for WikipediaSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: TOOL_NAME.into(),
        reason,
    }
}

#[async_trait]
impl Tool for WikipediaSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Searches Wikipedia using a keyword or search term and returns the matching article titles \
         and the content of the best match. The query should be a simple keyword or term, not a \
         full sentence or question."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A keyword or search term (e.g. 'Paris', 'Quantum Physics')"
                },
                "max_length": {
                    "type": "integer",
                    "description": "Maximum length of the returned content (default 2000)",
                    "default": DEFAULT_MAX_LENGTH
                }
            },
            "required": ["query"]
        })
    }

    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "search_results": { "type": "array", "items": { "type": "string" } },
                "content": { "type": "string" }
            }
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let max_length = arguments["max_length"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_LENGTH);

        debug!(query, "Searching Wikipedia");

        let limit = SEARCH_LIMIT.to_string();
        let search = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;
        let titles = parse_search_titles(&search);

        let Some(top) = titles.first() else {
            let content = format!("No results found for query: {query}");
            return Ok(ToolResult::ok(
                content.clone(),
                Some(serde_json::json!({ "search_results": [], "content": content })),
            ));
        };

        let page = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", top.as_str()),
                ("format", "json"),
            ])
            .await?;

        let content = match parse_extract(&page) {
            Some(text) => truncate(&text, max_length),
            None => format!("Page not found for: {top}"),
        };

        let output = format!(
            "Search results: {}\n\n{}",
            titles.join(", "),
            content
        );
        Ok(ToolResult::ok(
            output,
            Some(serde_json::json!({ "search_results": titles, "content": content })),
        ))
    }
}

/// Titles from a `list=search` response, best match first.
fn parse_search_titles(body: &serde_json::Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|h| h["title"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// The first non-empty page extract from a `prop=extracts` response.
fn parse_extract(body: &serde_json::Value) -> Option<String> {
    body["query"]["pages"]
        .as_object()?
        .values()
        .filter(|page| page.get("missing").is_none())
        .find_map(|page| page["extract"].as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
