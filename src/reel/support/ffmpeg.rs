use std::path::Path;
use std::process::Command;

use crate::reel::error::{ReelError, ReelResult};

/// Reports media durations. Backed by ffprobe in production.
pub trait MediaProbe {
    fn duration_seconds(&self, path: &Path) -> ReelResult<f64>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeProbe;

impl MediaProbe for FfprobeProbe {
    fn duration_seconds(&self, path: &Path) -> ReelResult<f64> {
        probe_duration_seconds(path)
    }
}

pub fn probe_duration_seconds(path: &Path) -> ReelResult<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|source| ReelError::Spawn {
            program: "ffprobe",
            source,
        })?;

    if !output.status.success() {
        return Err(ReelError::ProbeFailed {
            path: path.to_path_buf(),
            diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Encoder settings appended after the stream maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
}

impl EncodeProfile {
    pub fn new(video_codec: impl Into<String>, audio_codec: impl Into<String>) -> Self {
        Self {
            video_codec: video_codec.into(),
            audio_codec: audio_codec.into(),
        }
    }

    /// Pushes codec flags plus `-shortest` so the output ends with the narration.
    pub fn push_to(&self, args: &mut Vec<String>) {
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        args.push("-c:a".to_string());
        args.push(self.audio_codec.clone());
        args.push("-shortest".to_string());
    }
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self::new("libx264", "aac")
    }
}

/// Parses ffprobe's bare `format=duration` value.
pub fn parse_probe_output(stdout: &str) -> ReelResult<f64> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .ok_or_else(|| ReelError::ProbeUnparseable {
            output: value.to_string(),
        })
}
