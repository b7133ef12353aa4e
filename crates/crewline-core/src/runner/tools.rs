//! Tool directives and the web-backed tool implementations.
//!
//! An agent invokes a tool by making the first non-empty line of its reply a
//! directive:
//!
//! ```text
//! SEARCH: rust web frameworks 2025
//! FETCH: https://example.com/pricing
//! ASK_HUMAN: Which of these three names do you prefer?
//! ```
//!
//! The run loop only honors a directive when the matching capability was
//! granted at crew construction; anything else is treated as plain output.

use crate::error::CoreError;

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDirective {
    Search(String),
    Fetch(String),
    AskHuman(String),
}

/// Parse a directive from agent output.
///
/// Only the first non-empty line is considered; the argument is the rest of
/// that line. An empty argument is not a directive.
pub fn parse_directive(output: &str) -> Option<ToolDirective> {
    let line = output.lines().find(|l| !l.trim().is_empty())?.trim();

    let (keyword, build): (&str, fn(String) -> ToolDirective) = if line.starts_with("SEARCH:") {
        ("SEARCH:", ToolDirective::Search)
    } else if line.starts_with("FETCH:") {
        ("FETCH:", ToolDirective::Fetch)
    } else if line.starts_with("ASK_HUMAN:") {
        ("ASK_HUMAN:", ToolDirective::AskHuman)
    } else {
        return None;
    };

    let arg = line[keyword.len()..].trim();
    if arg.is_empty() {
        return None;
    }
    Some(build(arg.to_string()))
}

/// Maximum observation size fed back into a conversation.
const MAX_OBSERVATION_CHARS: usize = 8_000;

/// Web search via the Serper API (`SERPER_API_KEY`).
pub async fn remote_search(client: &reqwest::Client, query: &str) -> Result<String, CoreError> {
    let api_key = std::env::var("SERPER_API_KEY")
        .map_err(|_| CoreError::Runner("SERPER_API_KEY is not set".to_string()))?;

    tracing::info!("[Tools] search: {}", query);

    let response = client
        .post("https://google.serper.dev/search")
        .header("X-API-KEY", api_key)
        .json(&serde_json::json!({ "q": query }))
        .send()
        .await
        .map_err(|e| CoreError::Runner(format!("search request failed: {}", e)))?;

    let status = response.status();
    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| CoreError::Runner(format!("search response was not JSON: {}", e)))?;

    if !status.is_success() {
        return Err(CoreError::Runner(format!("search API returned {}: {}", status, json)));
    }

    let mut lines = Vec::new();
    if let Some(results) = json.get("organic").and_then(|v| v.as_array()) {
        for result in results.iter().take(8) {
            let title = result.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let link = result.get("link").and_then(|v| v.as_str()).unwrap_or("");
            let snippet = result.get("snippet").and_then(|v| v.as_str()).unwrap_or("");
            lines.push(format!("- {} ({})\n  {}", title, link, snippet));
        }
    }
    if lines.is_empty() {
        return Ok("No results.".to_string());
    }
    Ok(truncate(&lines.join("\n"), MAX_OBSERVATION_CHARS))
}

/// Fetch a page body as text.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, CoreError> {
    tracing::info!("[Tools] fetch: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CoreError::Runner(format!("fetch failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CoreError::Runner(format!("fetch of '{}' returned {}", url, status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| CoreError::Runner(format!("failed to read page body: {}", e)))?;
    Ok(truncate(&body, MAX_OBSERVATION_CHARS))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}…", truncated)
    }
}
