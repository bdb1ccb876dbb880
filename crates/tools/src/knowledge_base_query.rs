//! Knowledge base query tool — stub for domain knowledge lookups.
//!
//! A host application would run a similarity search against its document
//! store. The stub returns mock knowledge chunks sorted by similarity so the
//! pipeline can be tested end-to-end.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::{Tool, ToolContext, ToolMetadata};
use serde::Serialize;

pub struct KnowledgeBaseQueryTool {
    top_k: usize,
}

impl KnowledgeBaseQueryTool {
    pub fn new() -> Self {
        Self { top_k: 3 }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.clamp(1, 10);
        self
    }
}

impl Default for KnowledgeBaseQueryTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for KnowledgeBaseQueryTool {
    fn name(&self) -> &str {
        "knowledge_base_query"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "Query the knowledge base for domain facts, definitions and documentation. Returns chunks sorted by relevance.",
        )
        .with_keywords(["explain", "what", "concept", "docs"])
    }

    async fn invoke(&self, query: &str, _context: &ToolContext) -> Result<String, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::InvalidInput("empty knowledge query".into()));
        }

        let chunks = generate_mock_chunks(query, self.top_k);
        serde_json::to_string_pretty(&chunks).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct KnowledgeResult {
    document_id: String,
    chunk_index: usize,
    content: String,
    source: String,
    similarity: f64,
}

fn generate_mock_chunks(query: &str, top_k: usize) -> Vec<KnowledgeResult> {
    let q = query.to_lowercase();

    let knowledge_base: Vec<(&str, Vec<KnowledgeResult>)> = vec![
        ("rust", vec![
            KnowledgeResult {
                document_id: "doc_rust_001".into(),
                chunk_index: 0,
                content: "Rust is a multi-paradigm, general-purpose programming language that emphasizes performance, type safety, and concurrency.".into(),
                source: "rust_overview.md".into(),
                similarity: 0.95,
            },
            KnowledgeResult {
                document_id: "doc_rust_001".into(),
                chunk_index: 1,
                content: "Rust's ownership system guarantees memory safety and thread safety at compile time.".into(),
                source: "rust_overview.md".into(),
                similarity: 0.88,
            },
        ]),
        ("cache", vec![
            KnowledgeResult {
                document_id: "doc_cache_001".into(),
                chunk_index: 0,
                content: "An LRU cache evicts the least-recently-used entry when it reaches capacity.".into(),
                source: "caching.md".into(),
                similarity: 0.91,
            },
        ]),
    ];

    for (keyword, results) in &knowledge_base {
        if q.contains(keyword) {
            return results.iter().take(top_k).cloned().collect();
        }
    }

    // Generic fallback with decreasing similarity.
    (0..top_k)
        .map(|i| KnowledgeResult {
            document_id: format!("doc_gen_{:03}", i),
            chunk_index: 0,
            content: format!("Knowledge chunk {} related to '{}'.", i + 1, query),
            source: format!("knowledge_{}.md", i + 1),
            similarity: 0.9 - (i as f64 * 0.1),
        })
        .collect()
}
