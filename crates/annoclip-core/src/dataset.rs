//! Annotation dataset loading and row-to-record promotion
//!
//! A dataset is a CSV file with a header row. [`load_dataset`] only splits
//! it into [`AnnotationRow`]s; each extraction engine promotes the rows it
//! cares about with [`AudioRecord::from_row`] or [`ImageRecord::from_row`],
//! so a bad row is rejected for one extraction kind without touching the
//! others.

use crate::error::{DatasetError, RowError};
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Suffix that marks a file as an annotation dataset.
pub const DATASET_SUFFIX: &str = "_annotations.csv";

pub mod columns {
    pub const VIDEO_FILE_NAME: &str = "Video File Name";
    pub const ID: &str = "ID";
    pub const TRANSCRIPTION: &str = "Transcription";
    pub const START_TIME: &str = "Start Time (s)";
    pub const END_TIME: &str = "End Time (s)";
    pub const CROP_TIME: &str = "Crop Time (s)";
    pub const CROP_X1: &str = "Crop X1";
    pub const CROP_Y1: &str = "Crop Y1";
    pub const CROP_X2: &str = "Crop X2";
    pub const CROP_Y2: &str = "Crop Y2";
}

/// One raw dataset row: header/value pairs in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRow {
    line: u64,
    fields: Vec<(String, String)>,
}

impl AnnotationRow {
    pub fn new(line: u64, fields: Vec<(String, String)>) -> Self {
        Self { line, fields }
    }

    /// Line number in the source file
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Value of `column`. With duplicate headers the last one wins.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(header, _)| header == column)
            .map(|(_, value)| value.as_str())
    }

    fn require(&self, column: &'static str) -> Result<&str, RowError> {
        self.get(column).ok_or(RowError::MissingColumn(column))
    }

    fn number<T: FromStr>(&self, column: &'static str) -> Result<T, RowError> {
        let raw = self.require(column)?;
        raw.trim().parse().map_err(|_| RowError::InvalidNumber {
            column,
            value: raw.to_string(),
        })
    }
}

/// Read every row of the dataset at `path`.
///
/// A header-only or empty file yields an empty list.
pub async fn load_dataset(path: &Path) -> Result<Vec<AnnotationRow>, DatasetError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
        _ => DatasetError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let rows = parse_rows(&bytes).map_err(|e| DatasetError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub(crate) fn parse_rows(bytes: &[u8]) -> Result<Vec<AnnotationRow>, csv::Error> {
    // Short rows are allowed; their missing cells surface as missing columns
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);

        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();

        rows.push(AnnotationRow::new(line, fields));
    }

    Ok(rows)
}

/// An audio clip request.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRecord {
    pub id: String,
    pub video_filename: String,
    pub transcription: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl AudioRecord {
    pub fn from_row(row: &AnnotationRow) -> Result<Self, RowError> {
        Ok(Self {
            video_filename: row.require(columns::VIDEO_FILE_NAME)?.to_string(),
            start_time: row.number(columns::START_TIME)?,
            end_time: row.number(columns::END_TIME)?,
            transcription: row.require(columns::TRANSCRIPTION)?.to_string(),
            id: row.require(columns::ID)?.to_string(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Crop rectangle as annotated, in pixels. May lie partly outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// A crop rectangle that fits inside its frame and is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// Clamp into `[0, width] x [0, height]`.
    ///
    /// Returns `None` when nothing is left of the box after clamping.
    pub fn clamp(&self, width: u32, height: u32) -> Option<CropRect> {
        let (w, h) = (i64::from(width), i64::from(height));
        let x1 = self.x1.clamp(0, w);
        let y1 = self.y1.clamp(0, h);
        let x2 = self.x2.clamp(0, w);
        let y2 = self.y2.clamp(0, h);

        if x1 >= x2 || y1 >= y2 {
            return None;
        }

        // All four values are within u32 range after clamping
        Some(CropRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

impl std::fmt::Display for CropBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// An image crop request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub video_filename: String,
    pub transcription: String,
    pub crop_time: f64,
    pub crop_box: CropBox,
}

impl ImageRecord {
    pub fn from_row(row: &AnnotationRow) -> Result<Self, RowError> {
        Ok(Self {
            video_filename: row.require(columns::VIDEO_FILE_NAME)?.to_string(),
            crop_time: row.number(columns::CROP_TIME)?,
            crop_box: CropBox {
                x1: row.number(columns::CROP_X1)?,
                y1: row.number(columns::CROP_Y1)?,
                x2: row.number(columns::CROP_X2)?,
                y2: row.number(columns::CROP_Y2)?,
            },
            transcription: row.require(columns::TRANSCRIPTION)?.to_string(),
            id: row.require(columns::ID)?.to_string(),
        })
    }
}
