//! Response cache — rendered chat responses keyed by (query, context).
//!
//! Identical questions asked under different conversational context must not
//! share an answer, so the key is a SHA-256 fingerprint over both the literal
//! query text and a caller-supplied context hash. Storage, eviction and expiry
//! are entirely delegated to [`CacheEngine`].
//!
//! ```text
//! key = SHA256(len(query) || query || len(context_hash) || context_hash)
//! ```

use std::sync::Arc;

use parley_config::CacheConfig;
use parley_core::{ChatResponse, ContextEntry};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::{CacheEngine, CacheStats};

/// Composite key for a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    hash: [u8; 32],
}

impl ResponseKey {
    pub fn new(query: &str, context_hash: &str) -> Self {
        let mut hasher = Sha256::new();
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
        hasher.update((query.len() as u64).to_le_bytes());
        hasher.update(query.as_bytes());
        hasher.update((context_hash.len() as u64).to_le_bytes());
        hasher.update(context_hash.as_bytes());

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        Self { hash }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Fingerprint a retrieved-context snapshot.
///
/// Order matters: the same entries ranked differently fingerprint differently.
pub fn context_fingerprint(entries: &[ContextEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.source().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(entry.content().as_bytes());
        hasher.update(b"\x1e");
    }
    hex::encode(hasher.finalize())
}

/// Domain wrapper over the cache engine for fully-rendered responses.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    engine: Arc<CacheEngine<ResponseKey, ChatResponse>>,
}

impl ResponseCache {
    pub fn new(engine: Arc<CacheEngine<ResponseKey, ChatResponse>>) -> Self {
        Self { engine }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Arc::new(CacheEngine::from_config(config)))
    }

    /// Store a response for the (query, context) pair.
    pub fn cache_response(&self, query: &str, context_hash: &str, response: &ChatResponse) -> bool {
        let key = ResponseKey::new(query, context_hash);
        debug!(key = %key.to_hex(), tools = ?response.tools_used(), "caching response");
        self.engine.set(key, response.clone(), None)
    }

    /// Fetch a previously cached response, if still valid.
    pub fn get_response(&self, query: &str, context_hash: &str) -> Option<ChatResponse> {
        self.engine.get(&ResponseKey::new(query, context_hash))
    }

    pub fn stats(&self) -> CacheStats {
        self.engine.get_stats()
    }

    pub fn engine(&self) -> &Arc<CacheEngine<ResponseKey, ChatResponse>> {
        &self.engine
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
