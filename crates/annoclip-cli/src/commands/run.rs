use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;

use crate::args::RunOptions;
use annoclip_core::{
    config::{normalize_extensions, parse_extension_list, Config},
    report::ExtractionCounts,
    BatchConfig, BatchEvent, Orchestrator,
};
use annoclip_decode::FfmpegDecoder;

pub async fn run(options: &RunOptions, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let input_dir = absolute(&options.input_dir)?;
    let video_extensions = match options.video_extensions.as_deref() {
        Some(list) => parse_extension_list(list),
        None => normalize_extensions(&config.extraction.video_extensions),
    };

    let batch_config = BatchConfig {
        input_dir,
        output_folder_name: options
            .output_folder_name
            .clone()
            .unwrap_or_else(|| config.extraction.output_folder_name.clone()),
        enable_audio: options.audio_enabled(config.extraction.audio),
        enable_images: options.images_enabled(config.extraction.images),
        video_extensions,
        ffmpeg_path: config.ffmpeg_path(),
    };

    print_banner(&batch_config);

    let decoder = FfmpegDecoder::new(config.ffmpeg_path(), config.ffprobe_path());

    // Create progress channel
    let (tx, mut rx) = mpsc::channel(32);

    let style = ProgressStyle::with_template(
        "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )?
    .progress_chars("=>-");

    // Spawn progress handler
    let progress_handle = tokio::spawn(async move {
        let mut pb: Option<ProgressBar> = None;

        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Started { total } => {
                    let bar = ProgressBar::new(total as u64);
                    bar.set_style(style.clone());
                    pb = Some(bar);
                }
                BatchEvent::DatasetStarted { dataset, video, .. } => {
                    if let Some(bar) = &pb {
                        bar.set_message(format!("{} -> {}", truncate(&dataset, 40), video));
                    }
                }
                BatchEvent::DatasetSkipped { dataset, video, .. } => {
                    if let Some(bar) = &pb {
                        bar.println(format!("Skipped {}: no matching video '{}'", dataset, video));
                        bar.inc(1);
                    }
                }
                BatchEvent::DatasetFinished {
                    dataset,
                    audio,
                    images,
                    ..
                } => {
                    if let Some(bar) = &pb {
                        bar.println(format!(
                            "Done {} (audio: {}, images: {})",
                            dataset,
                            describe(audio),
                            describe(images)
                        ));
                        bar.inc(1);
                    }
                }
                BatchEvent::Complete { .. } => {
                    if let Some(bar) = pb.take() {
                        bar.finish_with_message("complete");
                    }
                }
            }
        }
    });

    let enable_audio = batch_config.enable_audio;
    let enable_images = batch_config.enable_images;

    // Run batch; dropping the orchestrator closes the progress channel
    let orchestrator = Orchestrator::new(batch_config, decoder, tx);
    let result = orchestrator.run().await;
    drop(orchestrator);

    progress_handle.await?;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\nError: {}", e);
            return Err(e.into());
        }
    };

    println!("\n{}", "=".repeat(60));
    println!(
        "Processing Summary: Processed {} video(s), skipped {} CSV(s).",
        summary.processed, summary.skipped
    );
    if enable_audio {
        println!("  Audio clips: {}", describe(Some(summary.audio)));
    }
    if enable_images {
        println!("  Image crops: {}", describe(Some(summary.images)));
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn print_banner(config: &BatchConfig) {
    println!(
        "annoclip started (Current Time: {})",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Input directory: '{}'", config.input_dir.display());
    println!("  Base output directory: '{}'", config.output_base_dir().display());
    println!("  Audio extraction: {}", enabled(config.enable_audio));
    println!("  Image extraction: {}", enabled(config.enable_images));
    println!("  Accepted video extensions: {}", config.video_extensions.join(", "));
    println!("{}", "-".repeat(60));
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn describe(counts: Option<ExtractionCounts>) -> String {
    match counts {
        Some(c) => format!("{} extracted, {} skipped", c.extracted, c.skipped),
        None => "disabled".to_string(),
    }
}

/// Make `path` absolute against the current directory, dropping `.` parts.
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };

    Ok(joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
