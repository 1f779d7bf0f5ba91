//! FFmpeg `-progress` output parsing.

use serde::{Deserialize, Serialize};

/// Snapshot emitted at each `progress=` line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    /// Output timestamp reached so far, in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_secs` encoded, capped at 100.
    pub fn percent_of(&self, total_secs: f64) -> u8 {
        if total_secs <= 0.0 {
            return 0;
        }
        let pct = (self.out_time_ms as f64 / 1000.0 / total_secs) * 100.0;
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Keys ffmpeg writes in a `-progress` block.
const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "stream_0_0_q",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Whether a stderr line belongs to the progress stream rather than a log message.
pub fn is_progress_line(line: &str) -> bool {
    line.split_once('=')
        .map(|(key, _)| PROGRESS_KEYS.contains(&key.trim()) || key.starts_with("stream_"))
        .unwrap_or(false)
}

/// Incremental parser for the key=value progress stream.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a snapshot at the end of each block.
    pub fn feed(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            // Despite the name ffmpeg reports microseconds here too.
            "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return Some(self.current.clone());
            }
            _ => {}
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_emits_on_progress_line() {
        let mut parser = ProgressParser::new();
        assert!(parser.feed("frame=90").is_none());
        assert!(parser.feed("out_time_us=3000000").is_none());
        assert!(parser.feed("speed=2.5x").is_none());

        let snapshot = parser.feed("progress=continue").unwrap();
        assert_eq!(snapshot.frame, 90);
        assert_eq!(snapshot.out_time_ms, 3000);
        assert!((snapshot.speed - 2.5).abs() < 0.01);
        assert!(!snapshot.is_complete);

        assert!(parser.feed("progress=end").unwrap().is_complete);
    }

    #[test]
    fn test_speed_na_is_ignored() {
        let mut parser = ProgressParser::new();
        parser.feed("speed=N/A");
        assert_eq!(parser.feed("progress=continue").unwrap().speed, 0.0);
    }

    #[test]
    fn test_percent_of() {
        let progress = FfmpegProgress {
            out_time_ms: 6000,
            ..Default::default()
        };
        assert_eq!(progress.percent_of(12.0), 50);
        assert_eq!(progress.percent_of(3.0), 100);
        assert_eq!(progress.percent_of(0.0), 0);
    }

    #[test]
    fn test_is_progress_line() {
        assert!(is_progress_line("out_time=00:00:01.000000"));
        assert!(is_progress_line("stream_0_0_q=23.0"));
        assert!(!is_progress_line("[in#2 @ 0x55] Error opening input: No such file"));
    }
}
