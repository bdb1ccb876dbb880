//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! `ChatUiError` is the base error surfaced by the middleware; each pipeline
//! stage has its own specialization. Collaborator-level errors (`ToolError`,
//! `ContextSourceError`) are recovered locally and only escalate when a whole
//! stage fails.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Error)]
pub enum ChatUiError {
    // --- Pipeline stage errors ---
    #[error("Tool execution error: {0}")]
    ToolExecution(#[from] ToolExecutionError),

    #[error("Context retrieval error: {0}")]
    ContextRetrieval(#[from] ContextRetrievalError),

    #[error("Rendering error: {0}")]
    Rendering(#[from] RenderingError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, ChatUiError>;

// --- Stage errors ---

/// Every selected tool failed or timed out.
#[derive(Debug, Clone, Error)]
#[error("all selected tools failed, last failure in {tool_name}: {reason}")]
pub struct ToolExecutionError {
    pub tool_name: String,
    pub reason: String,
}

/// An attached context store answered with data that could not be used.
#[derive(Debug, Clone, Error)]
#[error("context retrieval failed for user {user_id}: {reason}")]
pub struct ContextRetrievalError {
    pub user_id: String,
    pub reason: String,
}

/// Content could not be normalized into its detected type.
#[derive(Debug, Clone, Error)]
#[error("cannot render content ({reason}): {}", preview(.content))]
pub struct RenderingError {
    pub content: String,
    pub reason: String,
}

fn preview(content: &str) -> String {
    const MAX: usize = 80;
    match content.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

/// Errors reported by a context engine or memory manager.
#[derive(Debug, Clone, Error)]
pub enum ContextSourceError {
    /// The store could not be reached or answered with a transient failure.
    #[error("context source unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but the payload is unreadable.
    #[error("malformed context data: {0}")]
    Malformed(String),
}
