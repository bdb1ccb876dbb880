//! Stub tool implementations for Parley.
//!
//! Parley only decides which tools to call; real tools belong to the host
//! application. These stubs return deterministic mock data so the pipeline
//! can be driven end-to-end from tests and the demo CLI without network or
//! database access.

pub mod database_query;
pub mod knowledge_base_query;
pub mod web_search;

use std::sync::Arc;

use parley_core::tool::Tool;

pub use database_query::DatabaseQueryTool;
pub use knowledge_base_query::KnowledgeBaseQueryTool;
pub use web_search::WebSearchTool;

/// All built-in stub tools, ready to register with an orchestrator.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WebSearchTool::new()),
        Arc::new(DatabaseQueryTool::new()),
        Arc::new(KnowledgeBaseQueryTool::new()),
    ]
}
