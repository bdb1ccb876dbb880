//! End-to-end integration tests for the Parley pipeline.
//!
//! These tests drive the public crates together the way a host application
//! would: config → cache → selector → orchestrator → renderer → manager.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::{ChatManager, ContextRetriever, ResponseRenderer, ToolOrchestrator, ToolSelector};
use parley_cache::{CacheEngine, ResponseCache, context_fingerprint};
use parley_config::ChatConfig;
use parley_core::context::{ContextEngine, ContextEntry, ContextQuery};
use parley_core::error::{ChatUiError, ContextSourceError, ToolError};
use parley_core::memory::{MemoryEntry, MemoryManager};
use parley_core::response::{ChatResponse, ContentType};
use parley_core::tool::{Tool, ToolContext};
use parley_memory::InMemoryBackend;
use parley_tools::default_tools;

// ── Test doubles ─────────────────────────────────────────────────────────

struct AlwaysFails;

#[async_trait::async_trait]
impl Tool for AlwaysFails {
    fn name(&self) -> &str {
        "flaky_service"
    }

    async fn invoke(&self, _query: &str, _context: &ToolContext) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky_service".into(),
            reason: "upstream returned 503".into(),
        })
    }
}

struct ProfileEngine;

#[async_trait::async_trait]
impl ContextEngine for ProfileEngine {
    fn name(&self) -> &str {
        "profile"
    }

    async fn lookup(&self, query: &ContextQuery) -> Result<Vec<ContextEntry>, ContextSourceError> {
        Ok(vec![ContextEntry::new(
            format!("{} works in logistics", query.user_id),
            "profile",
            0.9,
            chrono::Utc::now(),
            "user_profile",
        )])
    }
}

fn full_manager(config: &ChatConfig) -> ChatManager {
    let orchestrator = ToolOrchestrator::new(&config.tools).with_tools(default_tools());
    ChatManager::new(config)
        .with_orchestrator(Arc::new(orchestrator))
        .with_renderer(Arc::new(ResponseRenderer::new()))
}

// ── Scenario 1: tool selection ───────────────────────────────────────────

#[test]
fn e2e_web_search_ranks_highest_for_online_lookup() {
    let selector = ToolSelector::default();
    let tools = ["web_search", "database_query", "file_analysis"];
    let scores = selector.score_tools("search for information online", &tools);

    assert_eq!(scores.len(), 3);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(&s.final_score)));
    let web = scores.iter().find(|s| s.tool_name == "web_search").unwrap();
    assert!(web.final_score > 0.5);
    assert!(
        scores
            .iter()
            .filter(|s| s.tool_name != "web_search")
            .all(|s| s.final_score < web.final_score)
    );
}

// ── Scenario 2: degraded mode ────────────────────────────────────────────

#[tokio::test]
async fn e2e_unconfigured_manager_echoes_input() {
    let manager = ChatManager::default();
    let response = manager
        .process_message("Hello, world!", "user-1", "session-1")
        .await
        .unwrap();

    assert_eq!(response.content(), "Hello, world!");
    assert_eq!(response.content_type(), ContentType::PlainText);
    assert!(response.tools_used().is_empty());
    assert!(response.execution_time() > 0.0);
}

// ── Scenario 3: total tool failure ───────────────────────────────────────

#[tokio::test]
async fn e2e_single_failing_tool_surfaces_tool_error() {
    let orchestrator = ToolOrchestrator::default().with_tool(Arc::new(AlwaysFails));
    let manager = ChatManager::default().with_orchestrator(Arc::new(orchestrator));

    let err = manager
        .process_message("check the status page", "user-1", "session-1")
        .await
        .unwrap_err();
    match err {
        ChatUiError::ToolExecution(e) => {
            assert_eq!(e.tool_name, "flaky_service");
            assert!(e.reason.contains("503"));
        }
        other => panic!("expected a tool execution error, got {other}"),
    }
}

// ── Scenario 4: content classification ───────────────────────────────────

#[test]
fn e2e_renderer_classifies_examples() {
    let renderer = ResponseRenderer::new();
    let cases = [
        (r#"{"key": "value"}"#, ContentType::Json),
        ("```python\nprint('hello')\n```", ContentType::CodeBlock),
        ("Error: Something went wrong", ContentType::Error),
        ("Hello world", ContentType::PlainText),
    ];
    for (text, expected) in cases {
        assert_eq!(renderer.detect_content_type(text), expected, "{text}");
        assert_eq!(renderer.detect_content_type(text), expected, "{text}");
    }
}

// ── Cache properties ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_cache_entry_expires_after_ttl() {
    let cache: CacheEngine<String, String> = CacheEngine::new(10, Duration::from_secs(60));
    cache.set("k".into(), "v".into(), Some(Duration::from_millis(50)));
    assert_eq!(cache.get(&"k".to_string()), Some("v".to_string()));

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(cache.get(&"k".to_string()), None);
    assert_eq!(cache.get_stats().cache_misses, 1);
}

#[test]
fn e2e_cache_evicts_least_recently_used() {
    let cache: CacheEngine<u32, u32> = CacheEngine::new(3, Duration::from_secs(60));
    for k in 0..3 {
        cache.set(k, k, None);
    }
    // Touch 0 so 1 becomes the eviction candidate.
    assert_eq!(cache.get(&0), Some(0));
    cache.set(3, 3, None);

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains(&1));
    assert!(cache.contains(&0));
    assert!(cache.contains(&3));
}

#[test]
fn e2e_response_cache_round_trip() {
    let cache = ResponseCache::default();
    let fingerprint = context_fingerprint(&[]);
    let response = ChatResponse::new(
        "{\n  \"a\": 1\n}",
        ContentType::Json,
        vec!["web_search".into()],
        0.25,
    );
    assert!(cache.cache_response("what is a", &fingerprint, &response));

    let hit = cache.get_response("what is a", &fingerprint).unwrap();
    assert_eq!(hit.content(), response.content());
    assert_eq!(hit.content_type(), response.content_type());
    assert!(cache.get_response("what is b", &fingerprint).is_none());
}

// ── Full pipeline with the stub tools ────────────────────────────────────

#[tokio::test]
async fn e2e_database_question_runs_database_tool() {
    let manager = full_manager(&ChatConfig::default());
    let response = manager
        .process_message("show pending orders in the database", "user-1", "session-1")
        .await
        .unwrap();

    assert_eq!(response.tools_used(), ["database_query"]);
    assert_eq!(response.content_type(), ContentType::Json);
    let data: serde_json::Value = serde_json::from_str(response.content()).unwrap();
    assert!(data["orders"].is_array());
}

#[tokio::test]
async fn e2e_cache_hit_preserves_tools_used() {
    let manager = full_manager(&ChatConfig::default());
    let first = manager
        .process_message("search the web for rust news", "user-1", "session-1")
        .await
        .unwrap();
    let second = manager
        .process_message("search the web for rust news", "user-1", "session-1")
        .await
        .unwrap();

    assert!(!first.from_cache());
    assert!(second.from_cache());
    assert_eq!(second.content(), first.content());
    assert_eq!(second.tools_used(), first.tools_used());
    assert!(second.timestamp() >= first.timestamp());

    let stats = manager.cache_stats().unwrap();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn e2e_failing_tool_is_isolated_from_healthy_one() {
    let manager = full_manager(&ChatConfig::default());
    // Both web_search and database_query qualify; the database stub fails
    // because no known table is named.
    let response = manager
        .process_message("search the web and the database", "user-1", "session-1")
        .await
        .unwrap();

    assert_eq!(response.tools_used(), ["web_search"]);
    assert_eq!(response.content_type(), ContentType::Json);
}

#[tokio::test]
async fn e2e_context_changes_the_cache_key() {
    let config = ChatConfig::default();
    let memory = Arc::new(InMemoryBackend::new());
    let retriever = ContextRetriever::new(&config.context)
        .with_context_engine(Arc::new(ProfileEngine))
        .with_memory_manager(memory.clone());
    let manager = full_manager(&config).with_retriever(Arc::new(retriever));

    let first = manager
        .process_message("latest rust news online", "user-1", "session-1")
        .await
        .unwrap();
    assert!(!first.from_cache());

    memory
        .store(MemoryEntry::new("user-1", "follows rust news closely"))
        .await
        .unwrap();

    let second = manager
        .process_message("latest rust news online", "user-1", "session-1")
        .await
        .unwrap();
    assert!(!second.from_cache());

    let third = manager
        .process_message("latest rust news online", "user-1", "session-1")
        .await
        .unwrap();
    assert!(third.from_cache());
}

// ── Configuration ────────────────────────────────────────────────────────

#[test]
fn e2e_config_file_drives_pipeline_limits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[cache]
max_size = 2

[tools]
min_score = 0.9
max_tools = 1

[context]
max_entries = 4
"#,
    )
    .unwrap();

    let config = ChatConfig::load_from(&path).unwrap();
    assert_eq!(config.cache.max_size, 2);
    assert_eq!(config.tools.max_tools, 1);
    assert_eq!(config.context.max_entries, 4);
    assert_eq!(config.tools.timeout_ms, 30_000);

    let orchestrator = ToolOrchestrator::new(&config.tools).with_tools(default_tools());
    // Nothing reaches 0.9, so only the top-ranked tool is picked.
    let selected = orchestrator.select("zzz qqq");
    assert_eq!(selected.len(), 1);

    let manager = ChatManager::new(&config);
    assert_eq!(manager.cache_stats().unwrap().max_size, 2);
}
