//! Per-record outcomes and their aggregation

use crate::dataset::CropBox;
use crate::error::RowError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a record produced no output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("malformed row: {0}")]
    Malformed(RowError),

    #[error("invalid duration ({0:.3}s)")]
    InvalidDuration(f64),

    #[error("video file not found: {}", .0.display())]
    VideoNotFound(PathBuf),

    #[error("video could not be opened: {}", .0.display())]
    VideoUnusable(PathBuf),

    #[error("invalid crop time ({0}s)")]
    InvalidTimestamp(f64),

    #[error("no frame at {0:.3}s")]
    NoFrame(f64),

    #[error("frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("invalid crop coordinates {0}")]
    InvalidCrop(CropBox),

    #[error("transcoder exited with code {0:?}")]
    TranscoderFailed(Option<i32>),

    #[error("transcoder could not be run: {0}")]
    TranscoderError(String),

    #[error("failed to write output: {0}")]
    WriteFailed(String),
}

/// Result of processing one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Extracted(PathBuf),
    Skipped(SkipReason),
}

/// Record-level results of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    pub extracted: Vec<PathBuf>,
    /// Source line and reason of every skipped row
    pub skipped: Vec<(u64, SkipReason)>,
}

impl ExtractionReport {
    pub fn record(&mut self, line: u64, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Extracted(path) => self.extracted.push(path),
            RecordOutcome::Skipped(reason) => self.skipped.push((line, reason)),
        }
    }

    pub fn counts(&self) -> ExtractionCounts {
        ExtractionCounts {
            extracted: self.extracted.len(),
            skipped: self.skipped.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionCounts {
    pub extracted: usize,
    pub skipped: usize,
}

impl std::ops::AddAssign for ExtractionCounts {
    fn add_assign(&mut self, other: Self) {
        self.extracted += other.extracted;
        self.skipped += other.skipped;
    }
}
