use serde::{Deserialize, Serialize};

use super::error::{ReelError, ReelResult};

/// How the background clip is stretched to cover the narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Loop a computed number of extra times.
    #[default]
    Counted,
    /// Loop forever and let the renderer stop at the shortest stream.
    Indefinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationPlan {
    /// Extra passes over the clip after the first one.
    pub loop_count: u32,
    pub source_clip_duration: f64,
    pub target_duration: f64,
    pub mode: LoopMode,
}

impl DurationPlan {
    /// Value for ffmpeg's `-stream_loop` input option.
    pub fn stream_loop_arg(&self) -> i64 {
        match self.mode {
            LoopMode::Counted => i64::from(self.loop_count),
            LoopMode::Indefinite => -1,
        }
    }

    /// Seconds of footage the looped input provides.
    pub fn looped_footage(&self) -> Option<f64> {
        match self.mode {
            LoopMode::Counted => Some(f64::from(self.loop_count + 1) * self.source_clip_duration),
            LoopMode::Indefinite => None,
        }
    }
}

fn require_positive(what: &'static str, value: f64) -> ReelResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ReelError::NonPositiveDuration { what, value })
    }
}

/// Sizes the clip loop so that, trimmed to the shortest stream, the output
/// spans the whole narration. Audio is never looped or cut.
pub fn plan_duration(audio_seconds: f64, clip_seconds: f64) -> ReelResult<DurationPlan> {
    let target = require_positive("Audio", audio_seconds)?;
    let clip = require_positive("Clip", clip_seconds)?;

    let loops = (target / clip).floor();
    let loop_count = if loops >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        loops as u32
    };

    Ok(DurationPlan {
        loop_count,
        source_clip_duration: clip,
        target_duration: target,
        mode: LoopMode::Counted,
    })
}

/// Like [`plan_duration`], but the clip is consumed from `trim_start` onward,
/// so the looped footage must also cover the skipped part.
pub fn plan_segment_duration(
    audio_seconds: f64,
    clip_seconds: f64,
    trim_start: f64,
) -> ReelResult<DurationPlan> {
    require_positive("Audio", audio_seconds)?;
    if !trim_start.is_finite() || trim_start < 0.0 {
        return Err(ReelError::NonPositiveDuration {
            what: "Clip offset",
            value: trim_start,
        });
    }
    plan_duration(audio_seconds + trim_start, clip_seconds)
}

/// Endless loop request; the clip duration does not need to be known.
pub fn plan_indefinite(audio_seconds: f64) -> ReelResult<DurationPlan> {
    let target = require_positive("Audio", audio_seconds)?;
    Ok(DurationPlan {
        loop_count: 0,
        source_clip_duration: 0.0,
        target_duration: target,
        mode: LoopMode::Indefinite,
    })
}
