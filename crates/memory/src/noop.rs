//! No-op memory backend — disables long-term memory entirely.

use async_trait::async_trait;
use parley_core::error::ContextSourceError;
use parley_core::memory::{MemoryEntry, MemoryManager, MemoryQuery};

/// A no-op memory manager that stores nothing and recalls nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryManager for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn store(&self, _entry: MemoryEntry) -> Result<String, ContextSourceError> {
        Ok(String::new())
    }

    async fn recall(&self, _query: &MemoryQuery) -> Result<Vec<MemoryEntry>, ContextSourceError> {
        Ok(Vec::new())
    }

    async fn count(&self, _user_id: &str) -> Result<usize, ContextSourceError> {
        Ok(0)
    }
}
