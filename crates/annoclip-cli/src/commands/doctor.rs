use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::process::Command;

use annoclip_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("annoclip dependency check\n");

    let mut all_ok = true;

    // Audio clips and frame reads
    all_ok &= check_tool("ffmpeg", &config.ffmpeg_path());
    // Opening videos for image crops
    all_ok &= check_tool("ffprobe", &config.ffprobe_path());

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
        println!("Without ffmpeg, audio extraction stops the run; without ffprobe, image crops are skipped.");
    }

    Ok(())
}

fn check_tool(name: &str, path: &Path) -> bool {
    print!("{:<9}", format!("{}:", name));

    match Command::new(path).arg("-version").output() {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            let version = parse_version(&text).unwrap_or_else(|| "unknown".to_string());
            println!("OK ({}, {})", version, path.display());
            true
        }
        Ok(_) => {
            println!("FOUND but failed to get version ({})", path.display());
            false
        }
        Err(_) => {
            println!("NOT FOUND");
            println!("         Install with: brew install ffmpeg");
            false
        }
    }
}

/// Version from the first line of `ffmpeg -version` / `ffprobe -version`
fn parse_version(output: &str) -> Option<String> {
    let re = Regex::new(r"^\S+ version (\S+)").ok()?;
    let caps = re.captures(output.lines().next()?)?;
    Some(caps.get(1)?.as_str().to_string())
}
