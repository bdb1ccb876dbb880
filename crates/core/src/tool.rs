//! Tool trait — the abstraction over external capabilities.
//!
//! Tools are what let the middleware answer beyond its own context:
//! search the web, query a database, look something up in a knowledge base.
//! Parley never implements tools itself; hosts register them with the
//! orchestrator and Parley decides which ones to call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ContextEntry;
use crate::error::ToolError;

/// Capability metadata used by the tool selector for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Free-text description of what the tool does.
    #[serde(default)]
    pub description: String,

    /// Extra keywords the tool should be matched on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ToolMetadata {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// True when neither a description nor keywords carry any signal.
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty() && self.keywords.is_empty()
    }
}

/// Payload handed to every tool invocation alongside the query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolContext {
    pub user_id: String,
    pub session_id: String,

    /// Retrieved context, already ranked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ContextEntry>,
}

impl ToolContext {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<ContextEntry>) -> Self {
        self.entries = entries;
        self
    }
}

/// The core Tool trait.
///
/// Each registrable capability implements this trait and is held by the
/// orchestrator as `Arc<dyn Tool>` under its unique name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search", "database_query").
    fn name(&self) -> &str;

    /// Scoring metadata. Defaults to none.
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::default()
    }

    /// Invoke the tool with the user's query and the retrieved context.
    async fn invoke(&self, query: &str, context: &ToolContext) -> Result<String, ToolError>;
}
