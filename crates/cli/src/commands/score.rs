//! `parley score` — Show tool scores for a query.

use parley_agent::ToolOrchestrator;
use parley_config::ChatConfig;

pub async fn run(query: &str, tools: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ChatConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = ToolOrchestrator::new(&config.tools).with_tools(parley_tools::default_tools());

    let names = if tools.is_empty() {
        orchestrator.tool_names()
    } else {
        tools
    };
    let ranked = orchestrator.selector().rank(query, names.as_slice());
    let selected: Vec<String> = orchestrator
        .select(query)
        .into_iter()
        .map(|s| s.tool_name)
        .collect();

    println!("  {:<24} {:>7} {:>8} {:>8} {:>8}", "TOOL", "SCORE", "LEXICAL", "TOPICAL", "META");
    for score in &ranked {
        let marker = if selected.contains(&score.tool_name) { "*" } else { " " };
        println!(
            "{marker} {:<24} {:>7.3} {:>8.3} {:>8.3} {:>8.3}",
            score.tool_name, score.final_score, score.lexical, score.topical, score.metadata
        );
    }
    println!();
    println!(
        "  * selected (min score {}, max {} tools)",
        config.tools.min_score, config.tools.max_tools
    );
    Ok(())
}
