use crate::config::generate::generate_starter_config;
use crate::stream::StreamCatalog;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/auditsync/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/auditsync/config.yml"));

    if config_path.exists() {
        return Err(format!(
            "config file already exists at {}; remove it first or use --stdout",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// Loads and validates a config, then lists what a run would do with each stream.
pub fn check(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;

    println!("Validating config file: {}", path.display());
    let config = crate::config::load_config(&path)?;
    let catalog = StreamCatalog::from_config(&config.streams);

    println!("✓ Config is valid");
    println!("  feed: {}", config.feed_api_root());
    for stream in &config.streams {
        match catalog.get(&stream.id) {
            Some(resolved) => println!(
                "  {} -> {} (cursor: {})",
                resolved.stream_id, resolved.destination, resolved.cursor_field
            ),
            None => println!(
                "  {} -> {} (unrecognized: no cursor_field, will be skipped)",
                stream.id, stream.destination
            ),
        }
    }
    Ok(())
}
