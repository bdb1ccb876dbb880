//! `parley config` — Configuration management commands.

use parley_config::ChatConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match ChatConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");
            println!();
            println!(
                "   Cache:     {} entries, ttl {}s",
                config.cache.max_size, config.cache.default_ttl_secs
            );
            println!(
                "   Tools:     timeout {}ms, deadline {}ms, grace {}ms",
                config.tools.timeout_ms,
                config.tools.aggregate_deadline_ms,
                config.tools.partial_grace_ms
            );
            println!(
                "   Selection: min score {}, max {} tools",
                config.tools.min_score, config.tools.max_tools
            );
            println!("   Context:   {} entries", config.context.max_entries);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChatConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = ChatConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
