//! Image crop extraction from decoded video frames

use crate::dataset::{AnnotationRow, ImageRecord};
use crate::naming::{output_file_name, ArtifactKind};
use crate::report::{ExtractionReport, RecordOutcome, SkipReason};
use annoclip_decode::{DecodeHandle, VideoDecoder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Decode handles opened during one [`ImageExtractor::extract`] call.
///
/// Each video is opened at most once. A video that fails to open is
/// remembered as unusable and never retried. Every handle is released when
/// the session is finished or dropped.
pub struct DecoderSession<'d, D: VideoDecoder> {
    decoder: &'d D,
    handles: HashMap<PathBuf, Option<D::Handle>>,
}

impl<'d, D: VideoDecoder> DecoderSession<'d, D> {
    pub fn new(decoder: &'d D) -> Self {
        Self {
            decoder,
            handles: HashMap::new(),
        }
    }

    /// The handle for `path`, opening it on first use.
    ///
    /// `None` if the video could not be opened, now or earlier.
    pub async fn handle(&mut self, path: &Path) -> Option<&mut D::Handle> {
        if !self.handles.contains_key(path) {
            let opened = match self.decoder.open(path).await {
                Ok(handle) => {
                    let (w, h) = handle.dimensions();
                    debug!("Decode handle opened for {} ({}x{})", path.display(), w, h);
                    Some(handle)
                }
                Err(e) => {
                    warn!(
                        "Could not open video file {}: {}. Skipping its image annotations.",
                        path.display(),
                        e
                    );
                    None
                }
            };
            self.handles.insert(path.to_path_buf(), opened);
        }

        self.handles.get_mut(path).and_then(Option::as_mut)
    }

    /// Number of videos currently held open
    pub fn open_count(&self) -> usize {
        self.handles.values().filter(|h| h.is_some()).count()
    }

    /// Release every handle; returns how many were released.
    pub fn finish(mut self) -> usize {
        self.release_all()
    }

    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (path, handle) in self.handles.drain() {
            if let Some(mut handle) = handle {
                handle.release();
                debug!("Released decode handle for {}", path.display());
                released += 1;
            }
        }
        released
    }
}

impl<D: VideoDecoder> Drop for DecoderSession<'_, D> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[derive(Debug)]
pub struct ImageExtractor<D> {
    decoder: D,
}

impl<D: VideoDecoder> ImageExtractor<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Save one PNG crop per valid image row.
    ///
    /// Every failure is per record; the report says what was skipped.
    pub async fn extract(
        &self,
        rows: &[AnnotationRow],
        source_video_dir: &Path,
        output_dir: &Path,
    ) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        if rows.is_empty() {
            info!("No annotations found for image extraction");
            return report;
        }

        info!("Processing {} annotations for image extraction", rows.len());

        let mut session = DecoderSession::new(&self.decoder);
        for row in rows {
            let outcome = extract_row(&mut session, row, source_video_dir, output_dir).await;
            report.record(row.line(), outcome);
        }
        let released = session.finish();

        let counts = report.counts();
        info!(
            "Image extraction complete: {} extracted, {} skipped ({} videos released)",
            counts.extracted, counts.skipped, released
        );
        report
    }
}

async fn extract_row<D: VideoDecoder>(
    session: &mut DecoderSession<'_, D>,
    row: &AnnotationRow,
    source_video_dir: &Path,
    output_dir: &Path,
) -> RecordOutcome {
    let record = match ImageRecord::from_row(row) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping row {}: {}", row.line(), e);
            return RecordOutcome::Skipped(SkipReason::Malformed(e));
        }
    };

    let video_path = source_video_dir.join(&record.video_filename);
    if !video_path.exists() {
        warn!(
            "Video file not found for {} (ID: {}). Skipping.",
            record.video_filename, record.id
        );
        return RecordOutcome::Skipped(SkipReason::VideoNotFound(video_path));
    }

    let timestamp = match Duration::try_from_secs_f64(record.crop_time) {
        Ok(timestamp) => timestamp,
        Err(_) => {
            warn!(
                "Skipping annotation {}: invalid crop time ({}s)",
                record.id, record.crop_time
            );
            return RecordOutcome::Skipped(SkipReason::InvalidTimestamp(record.crop_time));
        }
    };

    let Some(handle) = session.handle(&video_path).await else {
        return RecordOutcome::Skipped(SkipReason::VideoUnusable(video_path));
    };

    let frame = match handle.seek(timestamp).await {
        Ok(()) => handle.read_frame().await,
        Err(e) => Err(e),
    };

    let frame = match frame {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            warn!(
                "Could not read frame at {:.3}s for ID {} from {}. Skipping.",
                record.crop_time, record.id, record.video_filename
            );
            return RecordOutcome::Skipped(SkipReason::NoFrame(record.crop_time));
        }
        Err(e) => {
            warn!(
                "Could not decode frame at {:.3}s for ID {} from {}: {}",
                record.crop_time, record.id, record.video_filename, e
            );
            return RecordOutcome::Skipped(SkipReason::DecodeFailed(e.to_string()));
        }
    };

    let Some(rect) = record.crop_box.clamp(frame.width(), frame.height()) else {
        warn!(
            "Invalid crop coordinates for ID {} {}. Skipping crop.",
            record.id, record.crop_box
        );
        return RecordOutcome::Skipped(SkipReason::InvalidCrop(record.crop_box));
    };

    let crop = image::imageops::crop_imm(&frame, rect.x, rect.y, rect.width, rect.height)
        .to_image();

    let output_path = output_dir.join(output_file_name(
        &record.video_filename,
        &record.id,
        &record.transcription,
        ArtifactKind::Image,
    ));

    if let Err(e) = crop.save(&output_path) {
        warn!(
            "Failed to save image crop for ID {} to {}: {}",
            record.id,
            output_path.display(),
            e
        );
        return RecordOutcome::Skipped(SkipReason::WriteFailed(e.to_string()));
    }

    info!(
        "Extracted image crop for ID {} to {}",
        record.id,
        output_path.display()
    );
    RecordOutcome::Extracted(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{image_row, FakeDecoder};

    fn setup(videos: &[&str]) -> (tempfile::TempDir, tempfile::TempDir) {
        let source = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for name in videos {
            std::fs::write(source.path().join(name), b"video").unwrap();
        }
        (source, out)
    }

    #[tokio::test]
    async fn test_crops_and_saves_png() {
        let (source, out) = setup(&["clip.mp4"]);
        let extractor = ImageExtractor::new(FakeDecoder::new(64, 48, Duration::from_secs(10)));

        let rows = vec![image_row(2, "clip.mp4", "5", "1.5", ["10", "8", "30", "40"], "a cat")];
        let report = extractor.extract(&rows, source.path(), out.path()).await;

        assert_eq!(report.extracted, vec![out.path().join("clip_5_a_cat.png")]);

        let saved = image::open(&report.extracted[0]).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (20, 32));
        // Synthetic frames encode (x, y) in the red and green channels
        assert_eq!(saved.get_pixel(0, 0).0, [10, 8, 0]);
        assert_eq!(saved.get_pixel(19, 31).0, [29, 39, 0]);

        let stats = extractor.decoder().stats.borrow();
        assert_eq!(stats.seeks, vec![Duration::from_millis(1500)]);
    }

    #[tokio::test]
    async fn test_opens_each_video_once_and_releases_all() {
        let (source, out) = setup(&["a.mp4", "b.mp4"]);
        let extractor = ImageExtractor::new(FakeDecoder::new(32, 32, Duration::from_secs(10)));

        let crop = ["0", "0", "8", "8"];
        let rows = vec![
            image_row(2, "a.mp4", "1", "0.1", crop, "one"),
            image_row(3, "b.mp4", "2", "0.2", crop, "two"),
            image_row(4, "a.mp4", "3", "0.3", crop, "three"),
            image_row(5, "a.mp4", "4", "0.4", crop, "four"),
            image_row(6, "b.mp4", "5", "0.5", crop, "five"),
        ];
        let report = extractor.extract(&rows, source.path(), out.path()).await;
        assert_eq!(report.extracted.len(), 5);

        let stats = extractor.decoder().stats.borrow();
        assert_eq!(
            stats.opens,
            vec![source.path().join("a.mp4"), source.path().join("b.mp4")]
        );
        assert_eq!(stats.releases, 2);
    }

    #[tokio::test]
    async fn test_unopenable_video_is_not_retried() {
        let (source, out) = setup(&["broken.mp4", "good.mp4"]);
        let extractor = ImageExtractor::new(FakeDecoder::new(32, 32, Duration::from_secs(10)));

        let crop = ["0", "0", "8", "8"];
        let rows = vec![
            image_row(2, "broken.mp4", "1", "0", crop, "one"),
            image_row(3, "broken.mp4", "2", "1", crop, "two"),
            image_row(4, "good.mp4", "3", "1", crop, "three"),
        ];
        let report = extractor.extract(&rows, source.path(), out.path()).await;

        let broken = source.path().join("broken.mp4");
        assert_eq!(report.extracted.len(), 1);
        assert_eq!(
            report.skipped,
            vec![
                (2, SkipReason::VideoUnusable(broken.clone())),
                (3, SkipReason::VideoUnusable(broken.clone())),
            ]
        );

        let stats = extractor.decoder().stats.borrow();
        assert_eq!(stats.opens.iter().filter(|p| **p == broken).count(), 1);
        assert_eq!(stats.releases, 1);
    }

    #[tokio::test]
    async fn test_record_level_skips() {
        let (source, out) = setup(&["clip.mp4"]);
        let extractor = ImageExtractor::new(FakeDecoder::new(32, 32, Duration::from_secs(5)));

        let rows = vec![
            // Entirely outside the frame
            image_row(2, "clip.mp4", "1", "1", ["40", "0", "60", "10"], "outside"),
            // Past the end of the stream
            image_row(3, "clip.mp4", "2", "7.5", ["0", "0", "8", "8"], "late"),
            image_row(4, "clip.mp4", "3", "-1", ["0", "0", "8", "8"], "negative"),
            image_row(5, "missing.mp4", "4", "1", ["0", "0", "8", "8"], "gone"),
            image_row(6, "clip.mp4", "5", "1", ["0", "0", "x", "8"], "bad"),
            // Partly outside: clamped to the frame and kept
            image_row(7, "clip.mp4", "6", "1", ["-10", "-10", "100", "16"], "clamped"),
        ];
        let report = extractor.extract(&rows, source.path(), out.path()).await;

        let reasons: Vec<_> = report.skipped.iter().map(|(_, r)| r.clone()).collect();
        assert_eq!(
            reasons[0],
            SkipReason::InvalidCrop(crate::dataset::CropBox { x1: 40, y1: 0, x2: 60, y2: 10 })
        );
        assert_eq!(reasons[1], SkipReason::NoFrame(7.5));
        assert_eq!(reasons[2], SkipReason::InvalidTimestamp(-1.0));
        assert_eq!(reasons[3], SkipReason::VideoNotFound(source.path().join("missing.mp4")));
        assert!(matches!(reasons[4], SkipReason::Malformed(_)));

        assert_eq!(report.extracted, vec![out.path().join("clip_6_clamped.png")]);
        let saved = image::open(&report.extracted[0]).unwrap();
        assert_eq!((saved.width(), saved.height()), (32, 16));

        // The missing video never reached the decoder
        let stats = extractor.decoder().stats.borrow();
        assert_eq!(stats.opens, vec![source.path().join("clip.mp4")]);
        assert_eq!(stats.releases, 1);
    }

    #[tokio::test]
    async fn test_session_releases_on_drop() {
        let (source, _out) = setup(&["a.mp4", "broken.mp4"]);
        let decoder = FakeDecoder::new(8, 8, Duration::from_secs(1));

        {
            let mut session = DecoderSession::new(&decoder);
            assert!(session.handle(&source.path().join("a.mp4")).await.is_some());
            assert!(session.handle(&source.path().join("a.mp4")).await.is_some());
            assert!(session.handle(&source.path().join("broken.mp4")).await.is_none());
            assert_eq!(session.open_count(), 1);
        }

        let stats = decoder.stats.borrow();
        assert_eq!(stats.opens.len(), 2);
        assert_eq!(stats.releases, 1);
    }
}
