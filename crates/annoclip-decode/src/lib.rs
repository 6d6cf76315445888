//! Video frame decoding bridge for annoclip
//!
//! The extraction engines only see the [`VideoDecoder`] and [`DecodeHandle`]
//! traits. [`FfmpegDecoder`] implements them on top of the ffprobe and
//! ffmpeg binaries.

#![allow(async_fn_in_trait)]

mod error;
mod ffmpeg;

pub use error::DecodeError;
pub use ffmpeg::{FfmpegDecoder, FfmpegHandle};

use image::RgbImage;
use std::path::Path;
use std::time::Duration;

/// Opens decode handles for source videos.
pub trait VideoDecoder {
    type Handle: DecodeHandle;

    /// Open `path` for timestamp-based frame reads.
    async fn open(&self, path: &Path) -> Result<Self::Handle, DecodeError>;
}

/// An open connection to one video's frame data.
pub trait DecodeHandle {
    /// Frame dimensions reported when the video was opened.
    fn dimensions(&self) -> (u32, u32);

    /// Position the handle at `timestamp` from the start of the stream.
    async fn seek(&mut self, timestamp: Duration) -> Result<(), DecodeError>;

    /// Read the frame at the current position.
    ///
    /// Returns `Ok(None)` when the position is past the end of the stream.
    async fn read_frame(&mut self) -> Result<Option<RgbImage>, DecodeError>;

    /// Release the underlying resources. Calling it twice is a no-op.
    fn release(&mut self);
}
