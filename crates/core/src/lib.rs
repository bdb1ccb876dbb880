//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley chat middleware.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (tools, context engines, memory managers) is
//! defined as a trait here. Implementations live in their respective crates
//! or in the host application. This enables:
//! - Attaching collaborators lazily, or not at all
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod error;
pub mod memory;
pub mod response;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ContextEngine, ContextEntry, ContextQuery};
pub use error::{
    ChatUiError, ContextRetrievalError, ContextSourceError, RenderingError, Result, ToolError,
    ToolExecutionError,
};
pub use memory::{MemoryEntry, MemoryManager, MemoryQuery};
pub use response::{ChatResponse, ContentType, UiPhase, UiState};
pub use tool::{Tool, ToolContext, ToolMetadata};
