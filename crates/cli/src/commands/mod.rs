//! Subcommand implementations.

pub mod ask;
pub mod chat;
pub mod doctor;
pub mod init;

use quarry_agent::ResearchAgent;
use quarry_config::{AppConfig, ConfigError};

/// Load configuration, check credentials and wire up a research agent.
pub fn load_agent() -> Result<(AppConfig, ResearchAgent), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Err(ConfigError::MissingCredentials(missing)) = config.require_credentials() {
        print_setup_help(&missing);
        return Err(format!("Missing credentials: {}", missing.join(", ")).into());
    }

    let backend = quarry_providers::build_from_config(&config)
        .map_err(|e| format!("Failed to set up model backend: {e}"))?;
    let router = quarry_tools::build_router(&config)
        .map_err(|e| format!("Failed to set up actions: {e}"))?;

    let agent = quarry_agent::build_agent(&config, backend, router);
    Ok((config, agent))
}

fn print_setup_help(missing: &[String]) {
    eprintln!();
    eprintln!("  ERROR: Missing API credentials!");
    eprintln!();
    eprintln!("  Set these environment variables (or put them in a .env file):");
    for var in missing {
        eprintln!("    {var}=...");
    }
    eprintln!();
    eprintln!("  Or add them to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
    eprintln!("  Anthropic keys: https://console.anthropic.com");
    eprintln!("  Serper keys:    https://serper.dev");
    eprintln!();
}
