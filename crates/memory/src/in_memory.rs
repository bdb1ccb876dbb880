//! In-memory backend — useful for testing and ephemeral sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::ContextSourceError;
use parley_core::memory::{MemoryEntry, MemoryManager, MemoryQuery};
use tokio::sync::RwLock;
use uuid::Uuid;

/// An in-memory memory manager that keeps entries per user.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    entries: Arc<RwLock<HashMap<String, Vec<MemoryEntry>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query tokens present in the content, in [0, 1].
fn keyword_score(query: &HashSet<String>, content: &str) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let content = tokens(content);
    let matched = query.iter().filter(|t| content.contains(*t)).count();
    matched as f32 / query.len() as f32
}

#[async_trait]
impl MemoryManager for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, ContextSourceError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let id = entry.id.clone();
        self.entries
            .write()
            .await
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry);
        Ok(id)
    }

    async fn recall(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, ContextSourceError> {
        let entries = self.entries.read().await;
        let Some(user_entries) = entries.get(&query.user_id) else {
            return Ok(Vec::new());
        };
        let query_tokens = tokens(&query.text);

        let mut results: Vec<MemoryEntry> = user_entries
            .iter()
            .map(|e| {
                let mut e = e.clone();
                e.score = keyword_score(&query_tokens, &e.content);
                e
            })
            .filter(|e| e.score > 0.0 && e.score >= query.min_score)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        results.truncate(query.limit);

        Ok(results)
    }

    async fn count(&self, user_id: &str) -> Result<usize, ContextSourceError> {
        Ok(self
            .entries
            .read()
            .await
            .get(user_id)
            .map_or(0, Vec::len))
    }
}
