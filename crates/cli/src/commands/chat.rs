//! `parley chat` — Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use parley_agent::{ChatManager, ContextRetriever, ResponseRenderer, ToolOrchestrator};
use parley_config::ChatConfig;
use parley_core::response::ChatResponse;
use parley_memory::InMemoryBackend;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Wire a manager with every collaborator attached.
pub fn build_manager(config: &ChatConfig) -> ChatManager {
    let orchestrator =
        ToolOrchestrator::new(&config.tools).with_tools(parley_tools::default_tools());
    let retriever = ContextRetriever::new(&config.context)
        .with_memory_manager(Arc::new(InMemoryBackend::new()));

    ChatManager::new(config)
        .with_orchestrator(Arc::new(orchestrator))
        .with_retriever(Arc::new(retriever))
        .with_renderer(Arc::new(ResponseRenderer::new()))
}

pub async fn run(
    message: Option<String>,
    user: &str,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ChatConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let manager = build_manager(&config);
    tracing::debug!(user, session, "Chat manager ready");

    if let Some(msg) = message {
        // Single message mode
        let response = manager.process_message(&msg, user, session).await?;
        print_response(&response);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Parley — Interactive Mode");
    println!();
    println!("  User:      {user}");
    println!("  Session:   {session}");
    println!("  Tools:     web_search, database_query, knowledge_base_query");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit, 'stats' for cache statistics.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "stats" => {
                if let Some(stats) = manager.cache_stats() {
                    println!(
                        "  cache: {} entries, {} hits / {} requests ({:.0}%)",
                        stats.entries,
                        stats.cache_hits,
                        stats.total_requests,
                        stats.hit_rate * 100.0
                    );
                }
                continue;
            }
            _ => {}
        }

        match manager.process_message(input, user, session).await {
            Ok(response) => print_response(&response),
            Err(e) => eprintln!("  ❌ {e}"),
        }
        println!();
    }

    println!("  Goodbye!");
    Ok(())
}

fn print_response(response: &ChatResponse) {
    println!("{}", response.content());
    let tools = if response.tools_used().is_empty() {
        "none".to_string()
    } else {
        response.tools_used().join(", ")
    };
    eprintln!(
        "  [{} | tools: {} | {:.1}ms{}]",
        response.content_type(),
        tools,
        response.execution_time() * 1000.0,
        if response.from_cache() { " | cached" } else { "" }
    );
}
