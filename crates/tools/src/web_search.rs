//! Web search tool — stub that returns mock search results.
//!
//! A host application would call a real search API (Brave, Google, etc.).
//! The stub returns plausible, deterministic results so the orchestrator and
//! chat manager can be exercised end-to-end without network access.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::{Tool, ToolContext, ToolMetadata};
use serde::Serialize;

pub struct WebSearchTool {
    num_results: usize,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self { num_results: 3 }
    }

    pub fn with_num_results(mut self, n: usize) -> Self {
        self.num_results = n.clamp(1, 5);
        self
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "Search the web for information. Returns relevant results with titles, URLs, and snippets.",
        )
        .with_keywords(["internet", "online", "google", "news", "latest"])
    }

    async fn invoke(&self, query: &str, _context: &ToolContext) -> Result<String, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::InvalidInput("empty search query".into()));
        }

        let results = generate_mock_results(query, self.num_results);
        serde_json::to_string_pretty(&results).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

fn generate_mock_results(query: &str, count: usize) -> Vec<SearchResult> {
    let q = query.to_lowercase();

    // Topic-specific results for common queries.
    let templates: Vec<(&str, Vec<SearchResult>)> = vec![
        ("rust", vec![
            SearchResult {
                title: "The Rust Programming Language".into(),
                url: "https://doc.rust-lang.org/book/".into(),
                snippet: "Rust is a systems programming language focused on safety, speed, and concurrency.".into(),
            },
            SearchResult {
                title: "Rust by Example".into(),
                url: "https://doc.rust-lang.org/rust-by-example/".into(),
                snippet: "A collection of runnable examples that illustrate Rust concepts and standard library usage.".into(),
            },
        ]),
        ("weather", vec![
            SearchResult {
                title: "Weather Forecast - National Weather Service".into(),
                url: "https://weather.gov/".into(),
                snippet: "Current conditions and forecasts for locations across the United States.".into(),
            },
        ]),
    ];

    for (keyword, results) in &templates {
        if q.contains(keyword) {
            return results.iter().take(count).cloned().collect();
        }
    }

    (0..count)
        .map(|i| SearchResult {
            title: format!("Result {} for: {}", i + 1, query),
            url: format!("https://example.com/search?q={}&p={}", query.replace(' ', "+"), i + 1),
            snippet: format!("Mock search result for the query '{}'.", query),
        })
        .collect()
}
