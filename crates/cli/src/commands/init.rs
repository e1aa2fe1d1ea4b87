//! `guardfleet init`: first-time setup.

use guardfleet_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Guardfleet setup");
    println!("================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete it and re-run init.");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load_from(&config_path)?;
    for (label, path) in [
        ("boss list", &config.lists.bosses),
        ("target list", &config.lists.targets),
    ] {
        if path.exists() {
            println!("Found {label}: {}", path.display());
        } else {
            std::fs::write(path, "")?;
            println!("Created empty {label}: {}", path.display());
        }
    }

    println!("\nNext steps:");
    println!("  1. Add one boss username per line to {}", config.lists.bosses.display());
    println!("  2. Set server.host and server.port in {}", config_path.display());
    println!("  3. Run: guardfleet supervise");

    Ok(())
}
