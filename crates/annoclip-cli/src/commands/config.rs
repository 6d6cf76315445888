use anyhow::Result;
use std::path::Path;

use annoclip_core::config::{default_config_path, Config};

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("annoclip configuration\n");
    println!("{}", toml::to_string_pretty(&config)?.trim_end());

    println!("\nResolved tools:");
    println!("  ffmpeg = {}", describe_tool(config.paths.ffmpeg.is_some(), &config.ffmpeg_path()));
    println!("  ffprobe = {}", describe_tool(config.paths.ffprobe.is_some(), &config.ffprobe_path()));

    // Show config sources
    println!("\nConfig sources (later entries override earlier ones):");
    println!("  1. Built-in defaults");
    if let Some(default_config) = default_config_path() {
        println!("  2. {}", default_config.display());
    }
    if let Some(p) = config_path {
        println!("  3. {} (specified)", p.display());
    }
    println!("  4. Environment variables (ANNOCLIP_*, nested keys split on '__')");
    println!("  5. Command-line flags");

    Ok(())
}

fn describe_tool(configured: bool, path: &Path) -> String {
    if configured {
        format!("{:?}", path)
    } else {
        format!("{:?} (auto-detect)", path)
    }
}
