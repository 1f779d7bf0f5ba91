//! Filter graph construction for scene composition.
//!
//! Each scene contributes one video and one audio segment of exactly its
//! declared duration. Real media is normalized to the canonical format;
//! missing tracks become black frames or silence. Segments are concatenated
//! in scene order and subtitles, if any, are burned in afterwards.

use std::path::{Path, PathBuf};

use crate::assets::SceneAssets;
use crate::command::FfmpegCommand;
use crate::subtitles::escape_filter_path;

/// Canonical output format.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
}

impl OutputFormat {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: 30,
            sample_rate: 44_100,
        }
    }
}

/// One scene's contribution to the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSegment {
    pub duration: f64,
    pub video: Option<PathBuf>,
    pub video_is_image: bool,
    pub audio: Option<PathBuf>,
}

impl SceneSegment {
    pub fn from_assets(assets: &SceneAssets, duration: f64) -> Self {
        Self {
            duration,
            video: assets.video.clone(),
            video_is_image: assets.video.is_some() && assets.video_is_image,
            audio: assets.audio.clone(),
        }
    }
}

/// Which scene and track an ffmpeg input index belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub scene_index: usize,
    pub path: PathBuf,
}

/// A fully built composition: inputs, filter graph and output labels.
#[derive(Debug, Clone)]
pub struct CompositionGraph {
    /// `(input args, path)` per ffmpeg input, in input-index order
    pub inputs: Vec<(Vec<String>, PathBuf)>,
    pub slots: Vec<InputSlot>,
    pub filter: String,
    pub video_label: String,
    pub audio_label: String,
    pub segment_count: usize,
}

impl CompositionGraph {
    /// Build the graph for `segments` in order.
    pub fn build(segments: &[SceneSegment], format: &OutputFormat, subtitles: Option<&Path>) -> Self {
        let mut inputs: Vec<(Vec<String>, PathBuf)> = Vec::new();
        let mut slots = Vec::new();
        let mut chains = Vec::new();
        let mut concat_inputs = String::new();

        for (n, segment) in segments.iter().enumerate() {
            let d = format_secs(segment.duration);

            let video_chain = match &segment.video {
                Some(path) => {
                    let idx = inputs.len();
                    let args = if segment.video_is_image {
                        vec![
                            "-loop".to_string(),
                            "1".to_string(),
                            "-framerate".to_string(),
                            format.fps.to_string(),
                            "-t".to_string(),
                            d.clone(),
                        ]
                    } else {
                        Vec::new()
                    };
                    inputs.push((args, path.clone()));
                    slots.push(InputSlot {
                        scene_index: n,
                        path: path.clone(),
                    });
                    format!(
                        "[{idx}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format=yuv420p,\
                         tpad=stop_mode=clone:stop_duration={d},trim=duration={d},setpts=PTS-STARTPTS[v{n}]",
                        idx = idx,
                        w = format.width,
                        h = format.height,
                        fps = format.fps,
                        d = d,
                        n = n,
                    )
                }
                None => format!(
                    "color=c=black:s={w}x{h}:r={fps}:d={d},format=yuv420p,setsar=1,setpts=PTS-STARTPTS[v{n}]",
                    w = format.width,
                    h = format.height,
                    fps = format.fps,
                    d = d,
                    n = n,
                ),
            };

            let audio_chain = match &segment.audio {
                Some(path) => {
                    let idx = inputs.len();
                    inputs.push((Vec::new(), path.clone()));
                    slots.push(InputSlot {
                        scene_index: n,
                        path: path.clone(),
                    });
                    format!(
                        "[{idx}:a]aresample={sr},aformat=sample_fmts=fltp:channel_layouts=stereo,\
                         apad,atrim=duration={d},asetpts=PTS-STARTPTS[a{n}]",
                        idx = idx,
                        sr = format.sample_rate,
                        d = d,
                        n = n,
                    )
                }
                None => format!(
                    "anullsrc=r={sr}:cl=stereo,atrim=duration={d},\
                     aformat=sample_fmts=fltp:channel_layouts=stereo,asetpts=PTS-STARTPTS[a{n}]",
                    sr = format.sample_rate,
                    d = d,
                    n = n,
                ),
            };

            chains.push(video_chain);
            chains.push(audio_chain);
            concat_inputs.push_str(&format!("[v{n}][a{n}]", n = n));
        }

        chains.push(format!(
            "{}concat=n={}:v=1:a=1[vcat][acat]",
            concat_inputs,
            segments.len()
        ));

        let video_label = match subtitles {
            Some(path) => {
                chains.push(format!(
                    "[vcat]subtitles=filename={}[vout]",
                    escape_filter_path(path)
                ));
                "[vout]".to_string()
            }
            None => "[vcat]".to_string(),
        };

        Self {
            inputs,
            slots,
            filter: chains.join(";"),
            video_label,
            audio_label: "[acat]".to_string(),
            segment_count: segments.len(),
        }
    }

    /// Attach inputs, graph and stream maps to an ffmpeg command.
    pub fn apply(&self, mut cmd: FfmpegCommand) -> FfmpegCommand {
        for (args, path) in &self.inputs {
            cmd = cmd.input_with_args(args.clone(), path);
        }
        cmd.filter_complex(self.filter.clone())
            .map(self.video_label.clone())
            .map(self.audio_label.clone())
    }

    /// Scene whose input path appears in ffmpeg's stderr.
    pub fn scene_in_stderr(&self, stderr: &str) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| stderr.contains(slot.path.to_string_lossy().as_ref()))
            .map(|slot| slot.scene_index)
    }
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}
