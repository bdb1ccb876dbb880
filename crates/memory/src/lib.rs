//! Memory manager implementations for Parley.

pub mod in_memory;
pub mod noop;

pub use in_memory::InMemoryBackend;
pub use noop::NoopMemory;
