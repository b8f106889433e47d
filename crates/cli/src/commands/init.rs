//! `quarry init`: Write a default config file.

use quarry_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config file already exists: {}", config_path.display());
        println!("  Leaving it untouched.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote default config: {}", config_path.display());
    println!();
    println!("  Next: set ANTHROPIC_API_KEY and SERPER_API_KEY (environment or .env),");
    println!("  then run `quarry doctor`.");
    Ok(())
}
