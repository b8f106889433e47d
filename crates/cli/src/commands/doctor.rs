//! `quarry doctor`: Diagnose configuration and credentials.

use quarry_config::{ANTHROPIC_KEY_VAR, AppConfig, SERPER_KEY_VAR};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Quarry Doctor — Configuration Check");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ℹ️  No config file — using defaults (run `quarry init` to create one)");
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            println!("     model = {}, max_steps = {}", config.model, config.max_steps);

            if config.anthropic.api_key.is_some() {
                println!("  ✅ Anthropic API key configured");
            } else {
                println!("  ❌ No Anthropic API key — set {ANTHROPIC_KEY_VAR}");
                issues += 1;
            }

            if config.search.api_key.is_some() {
                println!("  ✅ Serper API key configured");
            } else {
                println!("  ❌ No Serper API key — set {SERPER_KEY_VAR}");
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
