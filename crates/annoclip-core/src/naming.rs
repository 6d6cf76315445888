//! Deterministic output file naming

use std::path::Path;

/// Maximum length of a sanitized label, in characters.
pub const MAX_LABEL_LEN: usize = 50;

/// Kind of artifact produced for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Image,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "wav",
            ArtifactKind::Image => "png",
        }
    }

    /// Subdirectory of a video's output folder
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "audio",
            ArtifactKind::Image => "images",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Audio => write!(f, "audio"),
            ArtifactKind::Image => write!(f, "image"),
        }
    }
}

/// Reduce a free-text label to a filesystem-safe token.
///
/// Keeps ASCII letters, digits and whitespace, trims, joins whitespace runs
/// with a single `_` and truncates to [`MAX_LABEL_LEN`] characters.
pub fn sanitize_label(label: &str) -> String {
    let kept: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_LABEL_LEN)
        .collect()
}

/// Video file name without its directory and extension.
pub fn video_stem(video_filename: &str) -> &str {
    Path::new(video_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(video_filename)
}

/// `{video_stem}_{record_id}_{sanitized_label}.{ext}`
pub fn output_file_name(
    video_filename: &str,
    record_id: &str,
    label: &str,
    kind: ArtifactKind,
) -> String {
    format!(
        "{}_{}_{}.{}",
        video_stem(video_filename),
        record_id,
        sanitize_label(label),
        kind.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("hello world"), "hello_world");
        assert_eq!(sanitize_label("  Hello,   World!  "), "Hello_World");
        assert_eq!(sanitize_label("tab\tand\nnewline"), "tab_and_newline");
        assert_eq!(sanitize_label("what?!/\\:*"), "what");
        assert_eq!(sanitize_label("café"), "caf");
        assert_eq!(sanitize_label(""), "");
        assert_eq!(sanitize_label("!!!"), "");
    }

    #[test]
    fn test_sanitize_label_truncates() {
        let long = "word ".repeat(40);
        let sanitized = sanitize_label(&long);
        assert_eq!(sanitized.chars().count(), MAX_LABEL_LEN);
        assert!(sanitized.starts_with("word_word_"));
    }

    #[test]
    fn test_sanitize_label_is_pure_and_safe() {
        let inputs = [
            "hello world",
            "  mixed\tWHITE  space ",
            "émoji 🎬 and ünïcode",
            "../../etc/passwd",
            "a;b|c>d<e\"f'g",
        ];

        for input in inputs {
            let first = sanitize_label(input);
            assert_eq!(first, sanitize_label(input));
            assert!(first.chars().count() <= MAX_LABEL_LEN);
            assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert!(!first.starts_with('_') && !first.ends_with('_'));
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("clip.mp4", "1", "hello world", ArtifactKind::Audio),
            "clip_1_hello_world.wav"
        );
        assert_eq!(
            output_file_name("my.video.MOV", "a7", "Cat!", ArtifactKind::Image),
            "my.video_a7_Cat.png"
        );
        assert_eq!(
            output_file_name("noext", "2", "", ArtifactKind::Image),
            "noext_2_.png"
        );
    }

    #[test]
    fn test_video_stem() {
        assert_eq!(video_stem("clip.mp4"), "clip");
        assert_eq!(video_stem("sub/dir/clip.mkv"), "clip");
        assert_eq!(video_stem("20250318_103319.mp4"), "20250318_103319");
    }
}
