//! Batch orchestration: pair datasets with videos and drive the engines

use crate::clipper::AudioExtractor;
use crate::cropper::ImageExtractor;
use crate::dataset::{load_dataset, AnnotationRow, DATASET_SUFFIX};
use crate::error::AnnoclipError;
use crate::naming::{video_stem, ArtifactKind};
use crate::report::ExtractionCounts;
use annoclip_decode::VideoDecoder;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding both the datasets and the source videos
    pub input_dir: PathBuf,
    /// Created inside `input_dir`
    pub output_folder_name: String,
    pub enable_audio: bool,
    pub enable_images: bool,
    /// Lowercase, with leading dot
    pub video_extensions: Vec<String>,
    pub ffmpeg_path: PathBuf,
}

impl BatchConfig {
    /// `<input_dir>/<output_folder_name>`
    pub fn output_base_dir(&self) -> PathBuf {
        self.input_dir.join(&self.output_folder_name)
    }
}

/// A dataset and the video it annotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetVideoPair {
    pub dataset_path: PathBuf,
    pub video_path: PathBuf,
}

impl DatasetVideoPair {
    pub fn video_filename(&self) -> String {
        file_name_lossy(&self.video_path)
    }

    /// Name of the per-video output folder
    pub fn video_stem(&self) -> String {
        video_stem(&self.video_filename()).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    Matched(DatasetVideoPair),
    Unmatched { video_filename: String },
}

/// Progress events emitted while a batch runs
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    DatasetStarted { index: usize, dataset: String, video: String },
    DatasetSkipped { index: usize, dataset: String, video: String },
    DatasetFinished {
        index: usize,
        dataset: String,
        audio: Option<ExtractionCounts>,
        images: Option<ExtractionCounts>,
    },
    Complete { summary: RunSummary },
}

/// Final counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Datasets whose video was found
    pub processed: usize,
    /// Datasets without a usable video
    pub skipped: usize,
    pub audio: ExtractionCounts,
    pub images: ExtractionCounts,
}

/// List `*_annotations.csv` files in `input_dir`, sorted by file name.
///
/// Hidden files and anything that is not a regular file are ignored.
pub fn discover_datasets(input_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut datasets = Vec::new();

    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if name.starts_with('.') || !name.ends_with(DATASET_SUFFIX) {
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        datasets.push(entry.path());
    }

    datasets.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(datasets)
}

/// Pair `dataset_path` with the video named by stripping the dataset suffix.
///
/// The video must exist in `input_dir` and carry one of `video_extensions`
/// (compared case-insensitively).
pub fn pair_dataset(dataset_path: &Path, input_dir: &Path, video_extensions: &[String]) -> Pairing {
    let dataset_name = file_name_lossy(dataset_path);
    let video_filename = dataset_name
        .strip_suffix(DATASET_SUFFIX)
        .unwrap_or(&dataset_name)
        .to_string();

    if video_filename.is_empty() {
        return Pairing::Unmatched { video_filename };
    }

    let video_path = input_dir.join(&video_filename);
    let extension = video_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()));

    let accepted = extension
        .as_ref()
        .is_some_and(|ext| video_extensions.iter().any(|accepted| accepted == ext));

    if accepted && video_path.is_file() {
        Pairing::Matched(DatasetVideoPair {
            dataset_path: dataset_path.to_path_buf(),
            video_path,
        })
    } else {
        Pairing::Unmatched { video_filename }
    }
}

/// Drives audio and image extraction over every dataset in a directory.
pub struct Orchestrator<D> {
    config: BatchConfig,
    audio: AudioExtractor,
    images: ImageExtractor<D>,
    progress_tx: mpsc::Sender<BatchEvent>,
}

impl<D: VideoDecoder> Orchestrator<D> {
    pub fn new(config: BatchConfig, decoder: D, progress_tx: mpsc::Sender<BatchEvent>) -> Self {
        let audio = AudioExtractor::new(config.ffmpeg_path.clone());
        Self {
            config,
            audio,
            images: ImageExtractor::new(decoder),
            progress_tx,
        }
    }

    /// Process every dataset in order.
    ///
    /// Fails only when the transcoder is missing or the output tree cannot
    /// be created.
    pub async fn run(&self) -> Result<RunSummary, AnnoclipError> {
        let base_dir = self.config.output_base_dir();
        tokio::fs::create_dir_all(&base_dir).await?;

        let mut summary = RunSummary::default();

        let datasets = discover_datasets(&self.config.input_dir)?;
        if datasets.is_empty() {
            info!(
                "No annotation files matching '*{}' in {}. Nothing to process.",
                DATASET_SUFFIX,
                self.config.input_dir.display()
            );
            self.emit(BatchEvent::Complete { summary }).await;
            return Ok(summary);
        }

        info!("Found {} annotation files", datasets.len());
        self.emit(BatchEvent::Started { total: datasets.len() }).await;

        for (index, dataset_path) in datasets.iter().enumerate() {
            let dataset = file_name_lossy(dataset_path);

            let pair = match pair_dataset(
                dataset_path,
                &self.config.input_dir,
                &self.config.video_extensions,
            ) {
                Pairing::Matched(pair) => pair,
                Pairing::Unmatched { video_filename } => {
                    warn!(
                        "Skipping '{}': no matching video '{}' in {} with accepted extensions",
                        dataset,
                        video_filename,
                        self.config.input_dir.display()
                    );
                    summary.skipped += 1;
                    self.emit(BatchEvent::DatasetSkipped {
                        index,
                        dataset,
                        video: video_filename,
                    })
                    .await;
                    continue;
                }
            };

            info!("Processing '{}' (video: '{}')", dataset, pair.video_filename());
            self.emit(BatchEvent::DatasetStarted {
                index,
                dataset: dataset.clone(),
                video: pair.video_filename(),
            })
            .await;

            let (audio, images) = self.process_pair(&pair, &base_dir).await?;
            summary.processed += 1;
            if let Some(counts) = audio {
                summary.audio += counts;
            }
            if let Some(counts) = images {
                summary.images += counts;
            }

            self.emit(BatchEvent::DatasetFinished {
                index,
                dataset,
                audio,
                images,
            })
            .await;
        }

        info!(
            "Processing summary: processed {} video(s), skipped {} dataset(s)",
            summary.processed, summary.skipped
        );
        self.emit(BatchEvent::Complete { summary }).await;

        Ok(summary)
    }

    async fn process_pair(
        &self,
        pair: &DatasetVideoPair,
        base_dir: &Path,
    ) -> Result<(Option<ExtractionCounts>, Option<ExtractionCounts>), AnnoclipError> {
        let video_dir = base_dir.join(pair.video_stem());
        tokio::fs::create_dir_all(&video_dir).await?;

        let rows = self.load_rows(&pair.dataset_path).await;
        let source_dir = &self.config.input_dir;

        let audio = if self.config.enable_audio {
            let dir = video_dir.join(ArtifactKind::Audio.dir_name());
            tokio::fs::create_dir_all(&dir).await?;
            info!("Starting audio extraction to {}", dir.display());
            Some(self.audio.extract(&rows, source_dir, &dir).await?.counts())
        } else {
            info!("Audio extraction disabled for this video");
            None
        };

        let images = if self.config.enable_images {
            let dir = video_dir.join(ArtifactKind::Image.dir_name());
            tokio::fs::create_dir_all(&dir).await?;
            info!("Starting image extraction to {}", dir.display());
            Some(self.images.extract(&rows, source_dir, &dir).await.counts())
        } else {
            info!("Image extraction disabled for this video");
            None
        };

        Ok((audio, images))
    }

    /// An unreadable dataset leaves nothing to process for its pair.
    async fn load_rows(&self, path: &Path) -> Vec<AnnotationRow> {
        match load_dataset(path).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }

    async fn emit(&self, event: BatchEvent) {
        // Progress display is optional; a closed receiver is not an error
        let _ = self.progress_tx.send(event).await;
    }
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
