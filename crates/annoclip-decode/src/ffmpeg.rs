//! Frame decoding through the ffprobe and ffmpeg binaries

use crate::{DecodeError, DecodeHandle, VideoDecoder};
use image::RgbImage;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }
}

impl VideoDecoder for FfmpegDecoder {
    type Handle = FfmpegHandle;

    /// Probe the first video stream; fails if the file has none.
    async fn open(&self, path: &Path) -> Result<FfmpegHandle, DecodeError> {
        debug!("Probing {}", path.display());

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height",
                "-of", "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DecodeError::FfprobeNotFound,
                _ => DecodeError::Io(e),
            })?;

        if !output.status.success() {
            debug!("ffprobe stderr: {}", String::from_utf8_lossy(&output.stderr));
            return Err(DecodeError::ProbeFailed(output.status.code()));
        }

        let (width, height) = parse_probe_output(&output.stdout)?
            .ok_or_else(|| DecodeError::NoVideoStream(path.display().to_string()))?;

        info!("Opened {} ({}x{})", path.display(), width, height);

        Ok(FfmpegHandle {
            ffmpeg_path: self.ffmpeg_path.clone(),
            path: path.to_path_buf(),
            width,
            height,
            position: Duration::ZERO,
            released: false,
        })
    }
}

/// Decode handle backed by one ffmpeg invocation per frame read.
#[derive(Debug)]
pub struct FfmpegHandle {
    ffmpeg_path: PathBuf,
    path: PathBuf,
    width: u32,
    height: u32,
    position: Duration,
    released: bool,
}

impl DecodeHandle for FfmpegHandle {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn seek(&mut self, timestamp: Duration) -> Result<(), DecodeError> {
        if self.released {
            return Err(DecodeError::Released);
        }
        self.position = timestamp;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<RgbImage>, DecodeError> {
        if self.released {
            return Err(DecodeError::Released);
        }

        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            // Input seek: ffmpeg decodes forward from the preceding keyframe
            .arg("-ss")
            .arg(format_timestamp(self.position))
            .arg("-i")
            .arg(&self.path)
            .args([
                "-map", "0:v:0",
                "-frames:v", "1",
                "-f", "image2pipe",
                "-c:v", "png",
                "-",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DecodeError::FfmpegNotFound,
                _ => DecodeError::Io(e),
            })?;

        if !output.status.success() {
            debug!("ffmpeg stderr: {}", String::from_utf8_lossy(&output.stderr));
            return Err(DecodeError::FfmpegFailed(output.status.code()));
        }

        if output.stdout.is_empty() {
            debug!(
                "No frame at {} in {}",
                format_timestamp(self.position),
                self.path.display()
            );
            return Ok(None);
        }

        let frame = image::load_from_memory(&output.stdout)?.to_rgb8();
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!("Released decode handle for {}", self.path.display());
        }
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<Option<(u32, u32)>, DecodeError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;

    Ok(probe.streams.into_iter().find_map(|s| match (s.width, s.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }))
}

/// Seconds with millisecond precision, as ffmpeg's `-ss` expects.
fn format_timestamp(ts: Duration) -> String {
    format!("{:.3}", ts.as_secs_f64())
}
