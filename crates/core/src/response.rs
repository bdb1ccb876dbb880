//! Chat responses, content types and transient UI state.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a piece of text should be presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    PlainText,
    Json,
    CodeBlock,
    Error,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Json => "json",
            Self::CodeBlock => "code_block",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Wall-clock "now" that never goes backwards within this process.
///
/// If the system clock steps back, the last handed-out instant is reused.
pub fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now();
    let micros = now.timestamp_micros();
    let prev = LAST_TIMESTAMP_MICROS.fetch_max(micros, Ordering::SeqCst);
    if prev > micros {
        DateTime::from_timestamp_micros(prev).unwrap_or(now)
    } else {
        now
    }
}

/// The final response for one processed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    content: String,
    content_type: ContentType,
    tools_used: Vec<String>,
    execution_time: f64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    from_cache: bool,
}

impl ChatResponse {
    /// Build a response stamped with the current process-monotonic time.
    ///
    /// Negative or non-finite execution times are clamped to zero.
    pub fn new(
        content: impl Into<String>,
        content_type: ContentType,
        tools_used: Vec<String>,
        execution_time: f64,
    ) -> Self {
        let execution_time = if execution_time.is_finite() && execution_time > 0.0 {
            execution_time
        } else {
            0.0
        };
        Self {
            content: content.into(),
            content_type,
            tools_used,
            execution_time,
            timestamp: monotonic_now(),
            from_cache: false,
        }
    }

    pub fn plain(content: impl Into<String>, execution_time: f64) -> Self {
        Self::new(content, ContentType::PlainText, Vec::new(), execution_time)
    }

    /// Mark the response as served from the response cache.
    pub fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    /// Elapsed seconds.
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}

/// Where a session's current request is in the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiPhase {
    #[default]
    Idle,
    Retrieving,
    Orchestrating,
    Rendering,
    Done,
    Failed,
}

/// Transient presentation state for a session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub session_id: String,
    pub phase: UiPhase,

    /// Content type of the most recent response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,

    /// Tools selected for the request currently executing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_in_flight: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl UiState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// True while a request is between retrieval and rendering.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            UiPhase::Retrieving | UiPhase::Orchestrating | UiPhase::Rendering
        )
    }
}
