//! Subtitle tracks.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::MediaResult;

/// Subtitle text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    /// Sniff the format from content. ASS files open with a `[Script Info]` section.
    pub fn detect(text: &str) -> Self {
        let head = text.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("[Script Info]") || text.contains("\n[Events]") {
            SubtitleFormat::Ass
        } else {
            SubtitleFormat::Srt
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
        }
    }
}

/// Write subtitle text into `dir`, returning the file path.
pub async fn write_subtitles(dir: &Path, text: &str) -> MediaResult<PathBuf> {
    let format = SubtitleFormat::detect(text);
    let path = dir.join(format!("subtitles.{}", format.extension()));
    fs::write(&path, text).await?;
    Ok(path)
}

/// Escape a path for use as a filter option value inside `-filter_complex`.
///
/// Two levels apply: the option parser, then the filtergraph parser.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();

    let mut option_level = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | ',' | ';' | '[' | ']') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }

    graph_level
}

/// `HH:MM:SS,mmm`
pub fn format_srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Build an SRT track with one cue per `(text, duration)` entry, laid out back to back.
///
/// Entries with empty text still advance the clock but emit no cue.
pub fn build_srt<'a, I>(cues: I) -> String
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut out = String::new();
    let mut start = 0.0;
    let mut number = 1;

    for (text, duration) in cues {
        let end = start + duration.max(0.0);
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                number,
                format_srt_timestamp(start),
                format_srt_timestamp(end),
                text
            ));
            number += 1;
        }
        start = end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            SubtitleFormat::detect("[Script Info]\nTitle: x\n\n[Events]\n"),
            SubtitleFormat::Ass
        );
        assert_eq!(
            SubtitleFormat::detect("1\n00:00:00,000 --> 00:00:01,000\nHi\n"),
            SubtitleFormat::Srt
        );
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(3723.456), "01:02:03,456");
    }

    #[test]
    fn test_build_srt_skips_empty_but_keeps_timing() {
        let srt = build_srt([("First line", 4.0), ("", 3.0), ("Third line", 5.0)]);
        let expected = "1\n00:00:00,000 --> 00:00:04,000\nFirst line\n\n\
                        2\n00:00:07,000 --> 00:00:12,000\nThird line\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_escape_plain_path_unchanged() {
        assert_eq!(
            escape_filter_path(Path::new("/tmp/vgen/job-1/subtitles.srt")),
            "/tmp/vgen/job-1/subtitles.srt"
        );
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape_filter_path(Path::new("/a:b")), r"/a\\:b");
        assert_eq!(escape_filter_path(Path::new("/a,b")), r"/a\,b");
        assert_eq!(escape_filter_path(Path::new("/it's")), r"/it\\\'s");
    }

    #[tokio::test]
    async fn test_write_subtitles_uses_detected_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_subtitles(tmp.path(), "[Script Info]\n").await.unwrap();
        assert_eq!(path.extension().unwrap(), "ass");
    }
}
