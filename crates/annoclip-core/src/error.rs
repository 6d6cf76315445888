//! Error types for annoclip-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnnoclipError>;

#[derive(Error, Debug)]
pub enum AnnoclipError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Audio extraction failed: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Annotation file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read annotations from {}: {}", .path.display(), .reason)]
    Unreadable { path: PathBuf, reason: String },
}

/// A row that cannot be promoted to a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("invalid number '{value}' in column '{column}'")]
    InvalidNumber { column: &'static str, value: String },
}

/// Errors that end the whole run.
///
/// Per-record failures are reported as [`crate::report::SkipReason`]s instead.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("FFmpeg not found at {}. Install with: brew install ffmpeg", .0.display())]
    TranscoderNotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
