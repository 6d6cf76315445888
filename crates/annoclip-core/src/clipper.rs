//! Audio clip extraction using FFmpeg

use crate::dataset::{AnnotationRow, AudioRecord};
use crate::error::AudioError;
use crate::naming::{output_file_name, ArtifactKind};
use crate::report::{ExtractionReport, RecordOutcome, SkipReason};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct AudioExtractor {
    ffmpeg_path: PathBuf,
}

impl AudioExtractor {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Cut one WAV clip per valid audio row.
    ///
    /// Only a missing transcoder is an error; everything else is recorded
    /// in the report and processing moves on to the next row.
    pub async fn extract(
        &self,
        rows: &[AnnotationRow],
        source_video_dir: &Path,
        output_dir: &Path,
    ) -> Result<ExtractionReport, AudioError> {
        let mut report = ExtractionReport::default();

        if rows.is_empty() {
            info!("No annotations found for audio extraction");
            return Ok(report);
        }

        info!("Processing {} annotations for audio extraction", rows.len());

        for row in rows {
            let outcome = self.extract_row(row, source_video_dir, output_dir).await?;
            report.record(row.line(), outcome);
        }

        let counts = report.counts();
        info!(
            "Audio extraction complete: {} extracted, {} skipped",
            counts.extracted, counts.skipped
        );
        Ok(report)
    }

    async fn extract_row(
        &self,
        row: &AnnotationRow,
        source_video_dir: &Path,
        output_dir: &Path,
    ) -> Result<RecordOutcome, AudioError> {
        let record = match AudioRecord::from_row(row) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping row {}: {}", row.line(), e);
                return Ok(RecordOutcome::Skipped(SkipReason::Malformed(e)));
            }
        };

        let duration = record.duration();
        // NaN fails this check too
        if !(duration > 0.0) {
            warn!(
                "Skipping annotation {}: invalid duration ({:.3}s)",
                record.id, duration
            );
            return Ok(RecordOutcome::Skipped(SkipReason::InvalidDuration(duration)));
        }

        let video_path = source_video_dir.join(&record.video_filename);
        if !video_path.exists() {
            warn!(
                "Video file not found for {} (ID: {}). Skipping.",
                record.video_filename, record.id
            );
            return Ok(RecordOutcome::Skipped(SkipReason::VideoNotFound(video_path)));
        }

        let output_path = output_dir.join(output_file_name(
            &record.video_filename,
            &record.id,
            &record.transcription,
            ArtifactKind::Audio,
        ));

        let args = transcode_args(&video_path, record.start_time, record.end_time, &output_path);

        let output = match Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                return Err(AudioError::TranscoderNotFound(self.ffmpeg_path.clone()));
            }
            Err(e) => {
                warn!("Could not run ffmpeg for ID {}: {}", record.id, e);
                return Ok(RecordOutcome::Skipped(SkipReason::TranscoderError(e.to_string())));
            }
        };

        if !output.status.success() {
            warn!(
                "Error extracting audio for ID {} from {}: exit code {:?}",
                record.id,
                record.video_filename,
                output.status.code()
            );
            debug!("ffmpeg stderr: {}", String::from_utf8_lossy(&output.stderr));
            return Ok(RecordOutcome::Skipped(SkipReason::TranscoderFailed(
                output.status.code(),
            )));
        }

        info!("Extracted audio for ID {} to {}", record.id, output_path.display());
        Ok(RecordOutcome::Extracted(output_path))
    }
}

/// Arguments for cutting `[start, end)` seconds of the first audio stream.
fn transcode_args(input: &Path, start: f64, end: f64, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y"]
        .iter()
        .map(OsString::from)
        .collect();

    args.push("-i".into());
    args.push(input.into());
    // Output-side seek (after -i) is frame-accurate
    args.push("-ss".into());
    args.push(start.to_string().into());
    args.push("-to".into());
    args.push(end.to_string().into());
    args.push("-vn".into());
    args.push("-map".into());
    args.push("0:a:0".into());
    args.push(output.into());

    args
}
