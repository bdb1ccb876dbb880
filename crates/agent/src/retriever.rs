//! Context retrieval — gathers ranked context from the attached sources.
//!
//! Two sources can be attached: a [`ContextEngine`] (vector stores,
//! conversation history) and a [`MemoryManager`] (long-term per-user facts).
//! Both are queried concurrently; their entries are validated, merged,
//! de-duplicated, ranked and truncated.
//!
//! A source that is down is tolerated as long as another source answered.
//! A source that returns malformed data always fails the retrieval.

use std::collections::HashSet;
use std::sync::Arc;

use parley_config::ContextConfig;
use parley_core::context::{ContextEngine, ContextEntry, ContextQuery, rank_order};
use parley_core::error::{ChatUiError, ContextRetrievalError, ContextSourceError};
use parley_core::memory::{MemoryManager, MemoryQuery};
use tracing::{debug, warn};

/// Source label given to entries recalled from the memory manager.
pub const MEMORY_SOURCE: &str = "memory";

/// A finite, single-pass stream of ranked context entries.
///
/// Ranking needs every source's answer, so the entries are fully buffered
/// when `retrieve` returns; the stream then hands them out one at a time
/// from that owned buffer. Once drained it stays empty.
#[derive(Debug)]
pub struct ContextStream {
    entries: std::vec::IntoIter<ContextEntry>,
}

impl ContextStream {
    pub fn empty() -> Self {
        Self::from_ranked(Vec::new())
    }

    fn from_ranked(entries: Vec<ContextEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for ContextStream {
    type Item = ContextEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for ContextStream {}

pub struct ContextRetriever {
    context_engine: Option<Arc<dyn ContextEngine>>,
    memory_manager: Option<Arc<dyn MemoryManager>>,
    max_entries: usize,
}

impl ContextRetriever {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            context_engine: None,
            memory_manager: None,
            max_entries: config.max_entries,
        }
    }

    pub fn with_context_engine(mut self, engine: Arc<dyn ContextEngine>) -> Self {
        self.context_engine = Some(engine);
        self
    }

    pub fn with_memory_manager(mut self, memory: Arc<dyn MemoryManager>) -> Self {
        self.memory_manager = Some(memory);
        self
    }

    pub fn attach_context_engine(&mut self, engine: Arc<dyn ContextEngine>) {
        self.context_engine = Some(engine);
    }

    pub fn attach_memory_manager(&mut self, memory: Arc<dyn MemoryManager>) {
        self.memory_manager = Some(memory);
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Whether any context source is attached.
    pub fn has_sources(&self) -> bool {
        self.context_engine.is_some() || self.memory_manager.is_some()
    }

    /// Fetch ranked context for a message.
    pub async fn retrieve(
        &self,
        user_id: &str,
        session_id: &str,
        query: &str,
    ) -> Result<ContextStream, ChatUiError> {
        if !self.has_sources() || self.max_entries == 0 {
            return Ok(ContextStream::empty());
        }

        let engine_query = ContextQuery {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            text: query.to_string(),
            limit: self.max_entries,
        };
        let memory_query = MemoryQuery {
            user_id: user_id.to_string(),
            text: query.to_string(),
            limit: self.max_entries,
            min_score: 0.0,
        };

        let engine_lookup = async {
            match &self.context_engine {
                Some(engine) => {
                    let result = engine.lookup(&engine_query).await;
                    Some((engine.name().to_string(), result))
                }
                None => None,
            }
        };
        let memory_lookup = async {
            match &self.memory_manager {
                Some(memory) => {
                    let result = memory.recall(&memory_query).await.map(|found| {
                        found
                            .into_iter()
                            .map(|m| {
                                ContextEntry::new(
                                    m.content,
                                    MEMORY_SOURCE,
                                    m.score,
                                    m.created_at,
                                    MEMORY_SOURCE,
                                )
                            })
                            .collect()
                    });
                    Some((memory.name().to_string(), result))
                }
                None => None,
            }
        };

        let (engine_result, memory_result) = tokio::join!(engine_lookup, memory_lookup);
        let outcomes: Vec<(String, Result<Vec<ContextEntry>, ContextSourceError>)> =
            [engine_result, memory_result].into_iter().flatten().collect();

        let attached = outcomes.len();
        let mut merged: Vec<ContextEntry> = Vec::new();
        let mut last_error: Option<(String, ContextSourceError)> = None;
        let mut failures = 0usize;

        for (source_name, outcome) in outcomes {
            match outcome {
                Ok(entries) => {
                    for entry in &entries {
                        entry.validate().map_err(|reason| {
                            retrieval_error(user_id, format!("{source_name}: {reason}"))
                        })?;
                    }
                    merged.extend(entries);
                }
                Err(ContextSourceError::Malformed(reason)) => {
                    return Err(retrieval_error(
                        user_id,
                        format!("{source_name}: malformed context data: {reason}"),
                    ));
                }
                Err(e) => {
                    failures += 1;
                    warn!(source = %source_name, user_id, error = %e, "Context source failed");
                    last_error = Some((source_name, e));
                }
            }
        }

        if failures == attached
            && let Some((source_name, e)) = last_error
        {
            return Err(retrieval_error(user_id, format!("{source_name}: {e}")));
        }

        // Rank first so the best-scored copy of a duplicate survives.
        merged.sort_by(rank_order);
        let mut seen: HashSet<(String, String)> = HashSet::new();
        merged.retain(|e| seen.insert((e.source().to_string(), e.content().to_string())));
        merged.truncate(self.max_entries);

        debug!(user_id, session_id, entries = merged.len(), "Context retrieved");
        Ok(ContextStream::from_ranked(merged))
    }
}

impl Default for ContextRetriever {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

fn retrieval_error(user_id: &str, reason: String) -> ChatUiError {
    ChatUiError::from(ContextRetrievalError {
        user_id: user_id.to_string(),
        reason,
    })
}
