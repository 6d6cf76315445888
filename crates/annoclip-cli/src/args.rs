use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "annoclip")]
#[command(author, version, about = "Extract audio clips and image crops from annotated videos")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the default `run` command
    #[command(flatten)]
    pub run: RunOptions,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract audio clips and image crops (default)
    Run {
        #[command(flatten)]
        options: RunOptions,
    },

    /// Check that ffmpeg and ffprobe are available
    Doctor,

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone, Debug)]
pub struct RunOptions {
    /// Directory containing both the videos and the annotation CSV files
    #[arg(short, long, default_value = ".")]
    pub input_dir: PathBuf,

    /// Name of the output folder created inside the input directory [default: output]
    #[arg(short, long)]
    pub output_folder_name: Option<String>,

    /// Enable audio extraction
    #[arg(long, overrides_with = "no_audio")]
    pub audio: bool,

    /// Disable audio extraction
    #[arg(long, overrides_with = "audio")]
    pub no_audio: bool,

    /// Enable image extraction
    #[arg(long, overrides_with = "no_images")]
    pub images: bool,

    /// Disable image extraction
    #[arg(long, overrides_with = "images")]
    pub no_images: bool,

    /// Comma-separated list of accepted video extensions [default: .mp4,.mov,.avi,.mkv,.webm]
    #[arg(long, value_name = "LIST")]
    pub video_extensions: Option<String>,
}

impl RunOptions {
    /// The last of `--audio` / `--no-audio` wins; otherwise `default`.
    pub fn audio_enabled(&self, default: bool) -> bool {
        toggle(self.audio, self.no_audio, default)
    }

    pub fn images_enabled(&self, default: bool) -> bool {
        toggle(self.images, self.no_images, default)
    }
}

fn toggle(on: bool, off: bool, default: bool) -> bool {
    if off {
        false
    } else if on {
        true
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("annoclip").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.input_dir, PathBuf::from("."));
        assert!(cli.run.output_folder_name.is_none());
        assert!(cli.run.audio_enabled(true));
        assert!(cli.run.images_enabled(true));
        assert!(cli.run.video_extensions.is_none());
    }

    #[test]
    fn test_toggles() {
        let cli = parse(&["--no-audio", "--images"]);
        assert!(!cli.run.audio_enabled(true));
        assert!(cli.run.images_enabled(false));

        let cli = parse(&["--no-images", "--images"]);
        assert!(cli.run.images_enabled(false));

        let cli = parse(&["--audio", "--no-audio"]);
        assert!(!cli.run.audio_enabled(true));
    }

    #[test]
    fn test_run_subcommand() {
        let cli = parse(&["-v", "run", "-i", "/data", "-o", "clips", "--video-extensions", ".mp4"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Some(Commands::Run { options }) => {
                assert_eq!(options.input_dir, PathBuf::from("/data"));
                assert_eq!(options.output_folder_name.as_deref(), Some("clips"));
                assert_eq!(options.video_extensions.as_deref(), Some(".mp4"));
            }
            _ => panic!("expected run command"),
        }
    }
}
