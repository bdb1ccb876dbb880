//! Context entries and the context-engine collaborator trait.
//!
//! A context engine is an external store that can answer "what do we already
//! know that is relevant to this query" for a user/session. Entries are
//! immutable once constructed; consumers rank them by descending relevance
//! with ties broken by recency.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ContextSourceError;

/// A single piece of retrieved context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    content: String,
    source: String,
    relevance_score: f32,
    timestamp: DateTime<Utc>,
    context_type: String,
}

impl ContextEntry {
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        relevance_score: f32,
        timestamp: DateTime<Utc>,
        context_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            relevance_score,
            timestamp,
            context_type: context_type.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn relevance_score(&self) -> f32 {
        self.relevance_score
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    /// Check the entry against the data-model invariants.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !self.relevance_score.is_finite() {
            return Err(format!(
                "non-finite relevance score from source '{}'",
                self.source
            ));
        }
        if !(0.0..=1.0).contains(&self.relevance_score) {
            return Err(format!(
                "relevance score {} outside [0, 1] from source '{}'",
                self.relevance_score, self.source
            ));
        }
        if self.source.trim().is_empty() {
            return Err("context entry without a source".into());
        }
        Ok(())
    }
}

/// Consumer ordering: higher relevance first, then more recent first.
pub fn rank_order(a: &ContextEntry, b: &ContextEntry) -> Ordering {
    b.relevance_score
        .partial_cmp(&a.relevance_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
}

/// A lookup request sent to a context engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextQuery {
    pub user_id: String,
    pub session_id: String,
    pub text: String,

    /// Maximum number of entries the caller will keep.
    pub limit: usize,
}

/// An external context store.
///
/// Implementations: vector stores, conversation-history services, etc.
#[async_trait]
pub trait ContextEngine: Send + Sync {
    /// The engine name (used in logs).
    fn name(&self) -> &str;

    /// Look up entries relevant to the query.
    async fn lookup(&self, query: &ContextQuery) -> Result<Vec<ContextEntry>, ContextSourceError>;
}
