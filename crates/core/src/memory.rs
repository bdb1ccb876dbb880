//! Memory manager trait — long-term recall of facts per user.
//!
//! The memory manager is the second context source consumed by the context
//! retriever. It remembers facts across sessions and answers keyword recall
//! queries with scored entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ContextSourceError;

/// A single memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// Owner of the memory
    pub user_id: String,

    /// The content of the memory
    pub content: String,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Source of the memory (session ID, tool output, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// When this memory was created
    pub created_at: DateTime<Utc>,

    /// Relevance score (set by recall)
    #[serde(default)]
    pub score: f32,
}

impl MemoryEntry {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            content: content.into(),
            tags: Vec::new(),
            source: None,
            created_at: Utc::now(),
            score: 0.0,
        }
    }
}

/// A recall request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub user_id: String,

    /// The search text
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_score: f32,
}

fn default_limit() -> usize {
    10
}

/// The memory manager trait.
///
/// Implementations: in-memory (for testing and ephemeral sessions), none (no-op).
#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// The backend name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Store a new memory entry, returning its id.
    async fn store(&self, entry: MemoryEntry) -> Result<String, ContextSourceError>;

    /// Recall memories matching the query, best first.
    async fn recall(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, ContextSourceError>;

    /// Number of memories held for a user.
    async fn count(&self, user_id: &str) -> Result<usize, ContextSourceError>;
}
