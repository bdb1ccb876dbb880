//! Parley CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive chat or single-message mode
//! - `score`   — Show how tools score against a query
//! - `render`  — Classify and render a piece of text
//! - `config`  — Show, locate or validate configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley — tool-selecting chat middleware",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat through the full pipeline with the built-in stub tools
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// User the messages are sent as
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Session the messages belong to
        #[arg(short, long, default_value = "cli")]
        session: String,
    },

    /// Score tools against a query
    Score {
        /// The query to score
        query: String,

        /// Tool names to score (defaults to the built-in tools)
        #[arg(short, long, value_delimiter = ',')]
        tools: Vec<String>,
    },

    /// Detect the content type of text and render it
    Render {
        /// The text to render
        text: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            user,
            session,
        } => commands::chat::run(message, &user, &session).await?,
        Commands::Score { query, tools } => commands::score::run(&query, tools).await?,
        Commands::Render { text } => commands::render::run(&text).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
