//! Configuration management for annoclip

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
    /// Path to ffprobe binary (auto-detected if not set)
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Folder created inside the input directory for all extracts
    pub output_folder_name: String,
    /// Extract audio clips
    pub audio: bool,
    /// Extract image crops
    pub images: bool,
    /// Accepted source video extensions, with leading dot
    pub video_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            extraction: ExtractionConfig {
                output_folder_name: "output".to_string(),
                audio: true,
                images: true,
                video_extensions: [".mp4", ".mov", ".avi", ".mkv", ".webm"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(default_config) = default_config_path() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::InvalidValue(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // ANNOCLIP_EXTRACTION__OUTPUT_FOLDER_NAME=clips
        figment = figment.merge(Env::prefixed("ANNOCLIP_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;

        if config.extraction.output_folder_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "extraction.output_folder_name must not be empty".to_string(),
            ));
        }

        Ok(config)
    }

    /// Get FFmpeg path, auto-detecting if not configured.
    ///
    /// Falls back to the bare program name so that a missing binary is
    /// reported when it is first spawned.
    pub fn ffmpeg_path(&self) -> PathBuf {
        resolve_tool(self.paths.ffmpeg.as_ref(), "ffmpeg")
    }

    /// Get ffprobe path, auto-detecting if not configured
    pub fn ffprobe_path(&self) -> PathBuf {
        resolve_tool(self.paths.ffprobe.as_ref(), "ffprobe")
    }
}

/// `<config_dir>/annoclip/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("annoclip/config.toml"))
}

fn resolve_tool(configured: Option<&PathBuf>, name: &str) -> PathBuf {
    match configured {
        Some(path) => path.clone(),
        None => which::which(name).unwrap_or_else(|_| PathBuf::from(name)),
    }
}

/// Normalize a list of extensions: trimmed, lowercased, leading dot, no blanks.
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| ext.as_ref().trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Parse a comma-separated extension list such as `.mp4,.MOV, mkv`.
pub fn parse_extension_list(list: &str) -> Vec<String> {
    normalize_extensions(list.split(','))
}
