//! Fixtures shared by the unit tests

use crate::dataset::{columns, parse_rows, AnnotationRow};
use annoclip_decode::{DecodeError, DecodeHandle, VideoDecoder};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub(crate) fn rows_from_csv(csv: &str) -> Vec<AnnotationRow> {
    parse_rows(csv.as_bytes()).unwrap()
}

fn row(line: u64, pairs: &[(&str, &str)]) -> AnnotationRow {
    AnnotationRow::new(
        line,
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

pub(crate) fn audio_row(
    line: u64,
    video: &str,
    id: &str,
    start: &str,
    end: &str,
    text: &str,
) -> AnnotationRow {
    row(
        line,
        &[
            (columns::VIDEO_FILE_NAME, video),
            (columns::ID, id),
            (columns::START_TIME, start),
            (columns::END_TIME, end),
            (columns::TRANSCRIPTION, text),
        ],
    )
}

pub(crate) fn image_row(
    line: u64,
    video: &str,
    id: &str,
    time: &str,
    crop: [&str; 4],
    text: &str,
) -> AnnotationRow {
    row(
        line,
        &[
            (columns::VIDEO_FILE_NAME, video),
            (columns::ID, id),
            (columns::CROP_TIME, time),
            (columns::CROP_X1, crop[0]),
            (columns::CROP_Y1, crop[1]),
            (columns::CROP_X2, crop[2]),
            (columns::CROP_Y2, crop[3]),
            (columns::TRANSCRIPTION, text),
        ],
    )
}

/// Shell script standing in for ffmpeg: logs its arguments to
/// `<dir>/ffmpeg.log` and creates the output file (its last argument).
#[cfg(unix)]
pub(crate) fn fake_ffmpeg(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        "#!/bin/sh\n\
         printf '%s\\n' \"$*\" >> \"$0.log\"\n\
         for last; do :; done\n\
         : > \"$last\"\n",
    )
}

/// Shell script standing in for ffmpeg that always exits with status 1.
#[cfg(unix)]
pub(crate) fn failing_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "ffmpeg", "#!/bin/sh\nexit 1\n")
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Debug, Default)]
pub(crate) struct DecoderStats {
    pub opens: Vec<PathBuf>,
    pub releases: usize,
    pub seeks: Vec<Duration>,
}

/// In-memory decoder serving synthetic frames.
///
/// Videos whose file name starts with `broken` fail to open; reads at or
/// past `length` return no frame.
#[derive(Debug, Clone)]
pub(crate) struct FakeDecoder {
    pub width: u32,
    pub height: u32,
    pub length: Duration,
    pub stats: Rc<RefCell<DecoderStats>>,
}

impl FakeDecoder {
    pub fn new(width: u32, height: u32, length: Duration) -> Self {
        Self {
            width,
            height,
            length,
            stats: Rc::default(),
        }
    }
}

impl VideoDecoder for FakeDecoder {
    type Handle = FakeHandle;

    async fn open(&self, path: &Path) -> Result<FakeHandle, DecodeError> {
        self.stats.borrow_mut().opens.push(path.to_path_buf());

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("broken") {
            return Err(DecodeError::NoVideoStream(path.display().to_string()));
        }

        Ok(FakeHandle {
            width: self.width,
            height: self.height,
            length: self.length,
            position: Duration::ZERO,
            released: false,
            stats: Rc::clone(&self.stats),
        })
    }
}

#[derive(Debug)]
pub(crate) struct FakeHandle {
    width: u32,
    height: u32,
    length: Duration,
    position: Duration,
    released: bool,
    stats: Rc<RefCell<DecoderStats>>,
}

impl DecodeHandle for FakeHandle {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn seek(&mut self, timestamp: Duration) -> Result<(), DecodeError> {
        self.stats.borrow_mut().seeks.push(timestamp);
        self.position = timestamp;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<RgbImage>, DecodeError> {
        if self.position >= self.length {
            return Ok(None);
        }
        Ok(Some(RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([x as u8, y as u8, 0])
        })))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.stats.borrow_mut().releases += 1;
        }
    }
}
