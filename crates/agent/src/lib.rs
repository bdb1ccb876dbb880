//! The Parley request pipeline.
//!
//! A message flows through four stages, each owned by one component:
//!
//! 1. [`ContextRetriever`] gathers ranked context for the user
//! 2. [`ToolSelector`] scores registered tools against the message
//! 3. [`ToolOrchestrator`] runs the selected tools concurrently and merges output
//! 4. [`ResponseRenderer`] classifies and normalizes the merged output
//!
//! [`ChatManager`] wires the stages together with the response cache and
//! tracks per-session UI state.

pub mod manager;
pub mod orchestrator;
pub mod renderer;
pub mod retriever;
pub mod selector;

#[cfg(test)]
mod test_helpers;

pub use manager::ChatManager;
pub use orchestrator::{RunPhase, ToolFailure, ToolOrchestrator, ToolRun};
pub use renderer::ResponseRenderer;
pub use retriever::{ContextRetriever, ContextStream};
pub use selector::{SelectorWeights, ToolScore, ToolSelector};
