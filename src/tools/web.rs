//! Web tools: search, page fetch and file download.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::safety::SafetyPolicy;

use super::{required_str, Tool};

const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";
const SEARCH_RESULT_LIMIT: usize = 5;
const FETCH_TEXT_LIMIT: usize = 5000;

/// Google search via SerpApi.
pub struct WebSearch {
    http: reqwest::Client,
    api_key: String,
}

impl WebSearch {
    /// Build the tool. An empty key makes the tool report itself
    /// unconfigured instead of failing the chat.
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &'static str {
        "webSearch"
    }

    fn description(&self) -> &'static str {
        "Search the web for information using Google (returns search results with snippets and links)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let query = match required_str(args, "query") {
            Ok(query) => query,
            Err(msg) => return msg,
        };
        if self.api_key.is_empty() {
            return "Error: SerpAPI key not configured. Please check your .env file.".to_string();
        }
        debug!(query, "web search");

        let mut endpoint = match Url::parse(SERPAPI_ENDPOINT) {
            Ok(endpoint) => endpoint,
            Err(err) => return format!("Error performing web search: {err}"),
        };
        endpoint
            .query_pairs_mut()
            .append_pair("q", query)
            .append_pair("api_key", &self.api_key)
            .append_pair("engine", "google")
            .append_pair("num", &SEARCH_RESULT_LIMIT.to_string());

        let response = match self.http.get(endpoint).send().await {
            Ok(response) => response,
            Err(err) => return format!("Error performing web search: {err}"),
        };
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return format!("Error: SerpAPI returned {}: {detail}", status.as_u16());
        }
        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(err) => return format!("Error performing web search: {err}"),
        };
        if let Some(error) = data.get("error").and_then(Value::as_str) {
            return format!("Error from SerpAPI: {error}");
        }

        let results = data
            .get("organic_results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if results.is_empty() {
            return format!("No results found for \"{query}\"");
        }

        let formatted: Vec<Value> = results
            .iter()
            .take(SEARCH_RESULT_LIMIT)
            .enumerate()
            .map(|(i, result)| {
                json!({
                    "position": i + 1,
                    "title": result.get("title").cloned().unwrap_or(Value::Null),
                    "link": result.get("link").cloned().unwrap_or(Value::Null),
                    "snippet": result.get("snippet").and_then(Value::as_str).unwrap_or(""),
                })
            })
            .collect();
        serde_json::to_string_pretty(&formatted)
            .unwrap_or_else(|err| format!("Error performing web search: {err}"))
    }
}

/// Fetch a URL and return its content in a model-friendly form.
pub struct FetchUrl {
    http: reqwest::Client,
}

impl FetchUrl {
    /// Build the tool.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Tool for FetchUrl {
    fn name(&self) -> &'static str {
        "fetchUrl"
    }

    fn description(&self) -> &'static str {
        "Fetch and read content from a URL"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to fetch content from"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let url = match required_str(args, "url") {
            Ok(url) => url,
            Err(msg) => return msg,
        };
        debug!(url, "fetching url");

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => return format!("Error fetching URL: {err}"),
        };
        let status = response.status();
        if !status.is_success() {
            return format!(
                "Failed to fetch URL: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("application/json") {
            match response.json::<Value>().await {
                Ok(data) => serde_json::to_string_pretty(&data)
                    .unwrap_or_else(|err| format!("Error fetching URL: {err}")),
                Err(err) => format!("Error fetching URL: {err}"),
            }
        } else if content_type.contains("text/") {
            match response.text().await {
                Ok(text) => truncate_chars(&text, FETCH_TEXT_LIMIT),
                Err(err) => format!("Error fetching URL: {err}"),
            }
        } else {
            format!("Fetched content from {url} (binary content not supported)")
        }
    }
}

/// Download a URL to a policy-checked local path.
pub struct DownloadFile {
    http: reqwest::Client,
    policy: Arc<SafetyPolicy>,
}

impl DownloadFile {
    /// Build the tool.
    #[must_use]
    pub fn new(http: reqwest::Client, policy: Arc<SafetyPolicy>) -> Self {
        Self { http, policy }
    }
}

#[async_trait]
impl Tool for DownloadFile {
    fn name(&self) -> &'static str {
        "downloadFile"
    }

    fn description(&self) -> &'static str {
        "Download a file from a URL to the local filesystem"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL of the file to download"},
                "fileName": {"type": "string", "description": "The name to save the file as"}
            },
            "required": ["url", "fileName"]
        })
    }

    async fn execute(&self, args: &Value) -> String {
        let url = match required_str(args, "url") {
            Ok(url) => url,
            Err(msg) => return msg,
        };
        let file_name = match required_str(args, "fileName") {
            Ok(name) => name,
            Err(msg) => return msg,
        };
        // The destination goes through the same gate as every other write.
        let path = match self.policy.check_path(file_name) {
            Ok(path) => path,
            Err(denied) => return denied,
        };
        debug!(url, file_name, "downloading file");

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => return format!("Error downloading file: {err}"),
        };
        let status = response.status();
        if !status.is_success() {
            return format!(
                "Failed to download: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return format!("Error downloading file: {err}"),
        };
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => format!("Successfully downloaded to {file_name} ({} bytes)", bytes.len()),
            Err(err) => format!("Error downloading file: {err}"),
        }
    }
}

/// Truncate to at most `limit` characters on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_web_search_without_key_reports_unconfigured() {
        let tool = WebSearch::new(reqwest::Client::new(), String::new());
        let result = tool.execute(&json!({"query": "rust async"})).await;
        assert_eq!(
            result,
            "Error: SerpAPI key not configured. Please check your .env file."
        );
    }

    #[tokio::test]
    async fn test_download_destination_is_policy_checked() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Arc::new(SafetyPolicy::new(
            &[dir.path().to_path_buf()],
            dir.path().to_path_buf(),
        ));
        let tool = DownloadFile::new(reqwest::Client::new(), policy);
        let result = tool
            .execute(&json!({
                "url": "https://example.com/file.bin",
                "fileName": "/etc/hijacked"
            }))
            .await;
        assert!(result.starts_with("Access denied"), "got: {result}");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        let long = "x".repeat(FETCH_TEXT_LIMIT + 50);
        assert_eq!(truncate_chars(&long, FETCH_TEXT_LIMIT).len(), FETCH_TEXT_LIMIT);
    }

    #[test]
    fn test_search_result_formatting() {
        let results = vec![
            json!({"title": "Rust", "link": "https://rust-lang.org", "snippet": "A language"}),
            json!({"title": "Docs", "link": "https://doc.rust-lang.org"}),
        ];
        let formatted: Vec<Value> = results
            .iter()
            .take(SEARCH_RESULT_LIMIT)
            .enumerate()
            .map(|(i, result)| {
                json!({
                    "position": i + 1,
                    "title": result.get("title").cloned().unwrap_or(Value::Null),
                    "link": result.get("link").cloned().unwrap_or(Value::Null),
                    "snippet": result.get("snippet").and_then(Value::as_str).unwrap_or(""),
                })
            })
            .collect();
        assert_eq!(formatted[0]["position"], 1);
        assert_eq!(formatted[1]["snippet"], "");
    }
}
