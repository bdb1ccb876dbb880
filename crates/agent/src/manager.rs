//! Chat manager — the request pipeline.
//!
//! For each incoming message:
//!
//! 1. **Retrieve** ranked context (no retriever → no context)
//! 2. **Check** the response cache, keyed on message + context fingerprint
//! 3. **Orchestrate** tools (no orchestrator, or nothing contributed → echo)
//! 4. **Render** the merged output (no renderer → raw plain text)
//! 5. **Store** the response when at least one tool contributed
//!
//! Every collaborator is optional. With nothing attached the manager
//! echoes the input, which keeps a half-configured host usable.
//!
//! Per-session UI state lives in a bounded [`CacheEngine`]: idle sessions
//! expire, and the least recently active one is evicted at capacity.

use std::sync::Arc;
use std::time::Instant;

use parley_cache::{CacheEngine, CacheStats, ResponseCache, context_fingerprint};
use parley_config::ChatConfig;
use parley_core::context::ContextEntry;
use parley_core::error::ChatUiError;
use parley_core::response::{ChatResponse, ContentType, UiPhase, UiState};
use parley_core::tool::ToolContext;
use tracing::{debug, info, warn};

use crate::orchestrator::ToolOrchestrator;
use crate::renderer::ResponseRenderer;
use crate::retriever::ContextRetriever;

pub struct ChatManager {
    orchestrator: Option<Arc<ToolOrchestrator>>,
    retriever: Option<Arc<ContextRetriever>>,
    renderer: Option<Arc<ResponseRenderer>>,
    response_cache: Option<ResponseCache>,
    ui_states: CacheEngine<String, UiState>,
}

impl ChatManager {
    /// A manager with a response cache sized from config and no other
    /// collaborators attached.
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            orchestrator: None,
            retriever: None,
            renderer: None,
            response_cache: Some(ResponseCache::from_config(&config.cache)),
            ui_states: CacheEngine::new(config.cache.max_sessions, config.cache.session_ttl()),
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: Arc<ToolOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<ContextRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<ResponseRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_response_cache(mut self, cache: ResponseCache) -> Self {
        self.response_cache = Some(cache);
        self
    }

    pub fn without_response_cache(mut self) -> Self {
        self.response_cache = None;
        self
    }

    pub fn attach_orchestrator(&mut self, orchestrator: Arc<ToolOrchestrator>) {
        self.orchestrator = Some(orchestrator);
    }

    pub fn attach_retriever(&mut self, retriever: Arc<ContextRetriever>) {
        self.retriever = Some(retriever);
    }

    pub fn attach_renderer(&mut self, renderer: Arc<ResponseRenderer>) {
        self.renderer = Some(renderer);
    }

    pub fn attach_response_cache(&mut self, cache: ResponseCache) {
        self.response_cache = Some(cache);
    }

    /// Current presentation state of a session, if it is still tracked.
    pub fn ui_state(&self, session_id: &str) -> Option<UiState> {
        self.ui_states.get(&session_id.to_string())
    }

    /// Number of sessions whose UI state is currently held.
    pub fn tracked_sessions(&self) -> usize {
        self.ui_states.len()
    }

    /// Response cache statistics, if a cache is attached.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.response_cache.as_ref().map(ResponseCache::stats)
    }

    /// Process one user message end to end.
    pub async fn process_message(
        &self,
        message: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<ChatResponse, ChatUiError> {
        let started = Instant::now();
        info!(user_id, session_id, chars = message.len(), "Processing message");

        self.update_state(session_id, |s| {
            s.phase = UiPhase::Retrieving;
            s.tools_in_flight.clear();
            s.last_error = None;
        });

        match self.run_pipeline(message, user_id, session_id, started).await {
            Ok(response) => {
                let content_type = response.content_type();
                self.update_state(session_id, |s| {
                    s.phase = UiPhase::Done;
                    s.content_type = Some(content_type);
                    s.tools_in_flight.clear();
                });
                info!(
                    session_id,
                    content_type = %content_type,
                    tools = ?response.tools_used(),
                    cached = response.from_cache(),
                    elapsed_ms = response.execution_time() * 1000.0,
                    "Message processed"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(session_id, error = %e, "Message processing failed");
                let message = e.to_string();
                self.update_state(session_id, |s| {
                    s.phase = UiPhase::Failed;
                    s.tools_in_flight.clear();
                    s.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        message: &str,
        user_id: &str,
        session_id: &str,
        started: Instant,
    ) -> Result<ChatResponse, ChatUiError> {
        let entries: Vec<ContextEntry> = match &self.retriever {
            Some(retriever) => retriever.retrieve(user_id, session_id, message).await?.collect(),
            None => Vec::new(),
        };
        let fingerprint = context_fingerprint(&entries);

        if let Some(cache) = &self.response_cache
            && let Some(hit) = cache.get_response(message, &fingerprint)
        {
            debug!(session_id, tools = ?hit.tools_used(), "Response cache hit");
            return Ok(ChatResponse::new(
                hit.content(),
                hit.content_type(),
                hit.tools_used().to_vec(),
                elapsed_secs(started),
            )
            .cached());
        }

        let Some(orchestrator) = &self.orchestrator else {
            return Ok(self.echo(message, started));
        };

        let selection = orchestrator.select(message);
        self.update_state(session_id, |s| {
            s.phase = UiPhase::Orchestrating;
            s.tools_in_flight = selection.iter().map(|t| t.tool_name.clone()).collect();
        });

        let context = ToolContext::new(user_id, session_id).with_entries(entries);
        let run = orchestrator.run(selection, message, &context).await?;
        if run.is_empty() {
            debug!(session_id, "No tool contributed, echoing input");
            return Ok(self.echo(message, started));
        }

        self.update_state(session_id, |s| {
            s.phase = UiPhase::Rendering;
            s.tools_in_flight.clear();
        });

        let (content, content_type) = match &self.renderer {
            Some(renderer) => renderer.render_auto(&run.output)?,
            None => (run.output, ContentType::PlainText),
        };

        let response = ChatResponse::new(
            content,
            content_type,
            run.tools_used,
            elapsed_secs(started),
        );
        if let Some(cache) = &self.response_cache {
            cache.cache_response(message, &fingerprint, &response);
        }
        Ok(response)
    }

    /// The degraded answer: the input itself, as plain text.
    fn echo(&self, message: &str, started: Instant) -> ChatResponse {
        let content = match &self.renderer {
            Some(renderer) => renderer
                .render(message, ContentType::PlainText)
                .unwrap_or_else(|_| message.to_string()),
            None => message.to_string(),
        };
        ChatResponse::plain(content, elapsed_secs(started))
    }

    fn update_state(&self, session_id: &str, update: impl FnOnce(&mut UiState)) {
        let key = session_id.to_string();
        let mut state = self
            .ui_states
            .get(&key)
            .unwrap_or_else(|| UiState::new(session_id));
        update(&mut state);
        debug!(session_id, phase = ?state.phase, "UI state updated");
        self.ui_states.set(key, state, None);
    }
}

impl Default for ChatManager {
    fn default() -> Self {
        Self::new(&ChatConfig::default())
    }
}

/// Seconds since `started`. A completed request always reports some time.
fn elapsed_secs(started: Instant) -> f64 {
    started.elapsed().as_secs_f64().max(1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingTool, StaticContextEngine, StaticTool, entry};
    use parley_config::ContextConfig;

    fn manager_with(tool: Arc<StaticTool>) -> ChatManager {
        ChatManager::default()
            .with_orchestrator(Arc::new(ToolOrchestrator::default().with_tool(tool)))
            .with_renderer(Arc::new(ResponseRenderer::new()))
    }

    #[tokio::test]
    async fn unattached_manager_echoes() {
        let manager = ChatManager::default();
        let response = manager
            .process_message("Hello, world!", "u1", "s1")
            .await
            .unwrap();
        assert_eq!(response.content(), "Hello, world!");
        assert_eq!(response.content_type(), ContentType::PlainText);
        assert!(response.tools_used().is_empty());
        assert!(response.execution_time() > 0.0);
    }

    #[tokio::test]
    async fn echo_is_not_cached() {
        let manager = ChatManager::default();
        manager.process_message("hi", "u1", "s1").await.unwrap();
        let second = manager.process_message("hi", "u1", "s1").await.unwrap();
        assert!(!second.from_cache());
        assert_eq!(manager.cache_stats().unwrap().entries, 0);
    }

    #[tokio::test]
    async fn tool_output_is_rendered() {
        let manager = manager_with(Arc::new(StaticTool::new("web_search", r#"{"hits":2}"#)));
        let response = manager
            .process_message("web search for rust", "u1", "s1")
            .await
            .unwrap();
        assert_eq!(response.content_type(), ContentType::Json);
        assert_eq!(response.content(), "{\n  \"hits\": 2\n}");
        assert_eq!(response.tools_used(), ["web_search"]);
    }

    #[tokio::test]
    async fn repeat_message_is_served_from_cache() {
        let tool = Arc::new(StaticTool::new("web_search", "fresh results"));
        let manager = manager_with(tool.clone());

        let first = manager.process_message("web search", "u1", "s1").await.unwrap();
        let second = manager.process_message("web search", "u1", "s1").await.unwrap();

        assert!(!first.from_cache());
        assert!(second.from_cache());
        assert_eq!(second.content(), first.content());
        assert_eq!(second.content_type(), first.content_type());
        assert_eq!(second.tools_used(), first.tools_used());
        assert_eq!(tool.calls(), 1);
        assert_eq!(manager.cache_stats().unwrap().cache_hits, 1);
    }

    #[tokio::test]
    async fn disabled_cache_reruns_tools() {
        let tool = Arc::new(StaticTool::new("web_search", "results"));
        let manager = manager_with(tool.clone()).without_response_cache();
        manager.process_message("web search", "u1", "s1").await.unwrap();
        manager.process_message("web search", "u1", "s1").await.unwrap();
        assert_eq!(tool.calls(), 2);
        assert!(manager.cache_stats().is_none());
    }

    #[tokio::test]
    async fn missing_renderer_passes_output_through() {
        let manager = ChatManager::default().with_orchestrator(Arc::new(
            ToolOrchestrator::default().with_tool(Arc::new(StaticTool::new("web_search", "<b>raw</b>"))),
        ));
        let response = manager.process_message("web search", "u1", "s1").await.unwrap();
        assert_eq!(response.content(), "<b>raw</b>");
        assert_eq!(response.content_type(), ContentType::PlainText);
    }

    #[tokio::test]
    async fn tool_failure_propagates_and_marks_state() {
        let manager = ChatManager::default().with_orchestrator(Arc::new(
            ToolOrchestrator::default().with_tool(Arc::new(FailingTool::new("always_fails"))),
        ));
        let err = manager
            .process_message("anything", "u1", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatUiError::ToolExecution(ref e) if e.tool_name == "always_fails"));

        let state = manager.ui_state("s1").unwrap();
        assert_eq!(state.phase, UiPhase::Failed);
        assert!(state.last_error.unwrap().contains("always_fails"));
    }

    #[tokio::test]
    async fn unterminated_code_fence_is_a_rendering_error() {
        let manager = manager_with(Arc::new(StaticTool::new(
            "web_search",
            "```python\nprint('never closed')",
        )));
        let err = manager.process_message("web search", "u1", "s1").await.unwrap_err();
        assert!(matches!(err, ChatUiError::Rendering(_)));
    }

    #[tokio::test]
    async fn malformed_context_fails_the_request() {
        let retriever = ContextRetriever::new(&ContextConfig::default())
            .with_context_engine(Arc::new(StaticContextEngine::malformed()));
        let manager = manager_with(Arc::new(StaticTool::new("web_search", "x")))
            .with_retriever(Arc::new(retriever));
        let err = manager.process_message("web search", "u7", "s1").await.unwrap_err();
        assert!(matches!(err, ChatUiError::ContextRetrieval(ref e) if e.user_id == "u7"));
    }

    #[tokio::test]
    async fn retrieved_context_reaches_tools() {
        let tool = Arc::new(StaticTool::new("web_search", "ok"));
        let retriever = ContextRetriever::new(&ContextConfig::default()).with_context_engine(
            Arc::new(StaticContextEngine::new(vec![entry("prefers rust", "profile", 0.8, 0)])),
        );
        let manager = manager_with(tool.clone()).with_retriever(Arc::new(retriever));
        manager.process_message("web search", "u1", "s1").await.unwrap();

        let context = tool.last_context().unwrap();
        assert_eq!(context.entries.len(), 1);
        assert_eq!(context.entries[0].content(), "prefers rust");
    }

    #[tokio::test]
    async fn ui_state_tracks_last_response() {
        let manager = manager_with(Arc::new(StaticTool::new("web_search", "Error: quota exceeded")));
        assert!(manager.ui_state("s9").is_none());
        manager.process_message("web search", "u1", "s9").await.unwrap();

        let state = manager.ui_state("s9").unwrap();
        assert_eq!(state.phase, UiPhase::Done);
        assert_eq!(state.content_type, Some(ContentType::Error));
        assert!(!state.is_busy());
        assert!(state.tools_in_flight.is_empty());
    }

    #[tokio::test]
    async fn ui_states_are_bounded_by_max_sessions() {
        let mut config = ChatConfig::default();
        config.cache.max_sessions = 16;
        let manager = ChatManager::new(&config);

        for i in 0..500 {
            manager
                .process_message("hi", "u", &format!("s{i}"))
                .await
                .unwrap();
        }

        assert_eq!(manager.tracked_sessions(), 16);
        assert!(manager.ui_state("s0").is_none());
        assert_eq!(manager.ui_state("s499").unwrap().phase, UiPhase::Done);
    }

    #[tokio::test]
    async fn idle_ui_state_expires() {
        let mut config = ChatConfig::default();
        config.cache.session_ttl_secs = 0;
        let manager = ChatManager::new(&config);
        manager.process_message("hi", "u", "s1").await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(manager.ui_state("s1").is_none());
    }
}
