//! Quarry CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Interactive research session (default)
//! - `ask`     Answer a single question and exit
//! - `doctor`  Check configuration and credentials
//! - `init`    Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Quarry — a web research agent for the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive research session
    Chat,

    /// Research a single question and print the answer
    Ask {
        /// The question to research
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and credentials
    Doctor,

    /// Write a default config file to ~/.quarry/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Credentials usually live in a local .env file
    let dotenv = dotenvy::dotenv();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run().await?,
        Commands::Ask { question, json } => commands::ask::run(question.join(" "), json).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Init => commands::init::run().await?,
    }

    Ok(())
}
