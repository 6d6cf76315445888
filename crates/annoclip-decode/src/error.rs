//! Error types for video frame decoding

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("ffprobe not found. Install with: brew install ffmpeg")]
    FfprobeNotFound,

    #[error("FFmpeg not found. Install with: brew install ffmpeg")]
    FfmpegNotFound,

    #[error("ffprobe failed with exit code: {0:?}")]
    ProbeFailed(Option<i32>),

    #[error("Failed to parse ffprobe output: {0}")]
    ProbeParse(#[from] serde_json::Error),

    #[error("No video stream in {0}")]
    NoVideoStream(String),

    #[error("FFmpeg frame decode failed with exit code: {0:?}")]
    FfmpegFailed(Option<i32>),

    #[error("Decode handle already released")]
    Released,

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
