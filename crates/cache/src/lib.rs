//! Caching for Parley: a generic TTL + LRU engine and the response cache
//! built on top of it.

pub mod engine;
pub mod response;

pub use engine::{CacheEngine, CacheEntry, CacheStats};
pub use response::{ResponseCache, ResponseKey, context_fingerprint};
