//! Shared test doubles for agent tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parley_core::context::{ContextEngine, ContextEntry, ContextQuery};
use parley_core::error::{ContextSourceError, ToolError};
use parley_core::tool::{Tool, ToolContext, ToolMetadata};

/// Build a context entry `age_secs` seconds old.
pub fn entry(content: &str, source: &str, score: f32, age_secs: i64) -> ContextEntry {
    ContextEntry::new(
        content,
        source,
        score,
        Utc::now() - chrono::Duration::seconds(age_secs),
        "note",
    )
}

enum EngineBehavior {
    Entries(Vec<ContextEntry>),
    Malformed,
    Unavailable,
}

/// A context engine that returns a fixed answer.
pub struct StaticContextEngine {
    behavior: EngineBehavior,
    calls: AtomicUsize,
}

impl StaticContextEngine {
    pub fn new(entries: Vec<ContextEntry>) -> Self {
        Self::with_behavior(EngineBehavior::Entries(entries))
    }

    pub fn malformed() -> Self {
        Self::with_behavior(EngineBehavior::Malformed)
    }

    pub fn unavailable() -> Self {
        Self::with_behavior(EngineBehavior::Unavailable)
    }

    fn with_behavior(behavior: EngineBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextEngine for StaticContextEngine {
    fn name(&self) -> &str {
        "static"
    }

    async fn lookup(&self, _query: &ContextQuery) -> Result<Vec<ContextEntry>, ContextSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            EngineBehavior::Entries(entries) => Ok(entries.clone()),
            EngineBehavior::Malformed => Err(ContextSourceError::Malformed(
                "expected a list of entries".into(),
            )),
            EngineBehavior::Unavailable => Err(ContextSourceError::Unavailable(
                "connection refused".into(),
            )),
        }
    }
}

/// A tool that always answers with the same text, optionally after a delay.
pub struct StaticTool {
    name: String,
    output: String,
    delay: Option<Duration>,
    metadata: ToolMetadata,
    calls: AtomicUsize,
    last_context: Mutex<Option<ToolContext>>,
}

impl StaticTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            delay: None,
            metadata: ToolMetadata::default(),
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<ToolContext> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ToolMetadata {
        self.metadata.clone()
    }

    async fn invoke(&self, _query: &str, context: &ToolContext) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(context.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.clone())
    }
}

/// A tool that always fails.
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _query: &str, _context: &ToolContext) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason: "backend exploded".into(),
        })
    }
}
