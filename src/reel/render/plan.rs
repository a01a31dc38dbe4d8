//! Render plans: everything ffmpeg needs to produce one output file.
//!
//! A plan is built once per part and handed to the compiler untouched. Text
//! overlays are stored pre-escaped and in drawing order; later overlays are
//! painted on top of earlier ones.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::reel::config::ReelConfig;
use crate::reel::duration::DurationPlan;
use crate::reel::error::{ReelError, ReelResult};
use crate::reel::timing::{CaptionTrack, TimeWindow};

use super::text::DrawText;

/// Distance of the first title line from the top edge.
pub const TITLE_TOP_MARGIN: u32 = 50;
/// Distance of the part label from the bottom edge.
pub const PART_LABEL_MARGIN: u32 = 200;
/// Distance of branding and bottom-anchored text from the bottom edge.
pub const BOTTOM_MARGIN: u32 = 50;
/// Left offset of the logo.
pub const LOGO_LEFT_MARGIN: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInputs {
    pub clip: PathBuf,
    pub audio: PathBuf,
    pub logo: Option<PathBuf>,
}

impl PlanInputs {
    pub const CLIP: usize = 0;
    pub const AUDIO: usize = 1;
    pub const LOGO: usize = 2;
}

/// Where a text overlay sits. All anchors are horizontally centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "anchor", rename_all = "lowercase")]
pub enum Anchor {
    Top { y: u32 },
    Middle,
    Bottom { margin: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStyle {
    pub font_size: u32,
    pub border_width: u32,
    pub boxed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayRole {
    Title,
    PartLabel,
    Caption,
    Attribution,
    Branding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOverlay {
    pub role: OverlayRole,
    pub text: DrawText,
    pub position: Anchor,
    pub style: TextStyle,
    /// `None` keeps the text on screen for the whole output.
    pub visibility_window: Option<TimeWindow>,
}

/// Logo pinned to the bottom-left corner, scaled to `height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogoOverlay {
    pub input_index: usize,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Overlay {
    Text(TextOverlay),
    Image(LogoOverlay),
}

/// A caption paired with the window it is visible in.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionUnit {
    pub text: String,
    pub visibility_window: TimeWindow,
}

/// Attribution card: windowed cards follow the captions in the middle of
/// the frame, unwindowed ones stay at the bottom for the whole output.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub text: String,
    pub window: Option<TimeWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLabel {
    pub index: usize,
    pub total: usize,
}

impl PartLabel {
    pub fn text(&self) -> String {
        format!("part {} of {}", self.index, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub inputs: PlanInputs,
    pub overlays: Vec<Overlay>,
    pub output_path: PathBuf,
    pub duration: DurationPlan,
    /// Length of the narration, which is also the output length.
    pub audio_duration: f64,
    /// Seconds of background footage skipped before this part starts.
    pub clip_offset: f64,
    pub audio_gain: f32,
    pub frame: FrameSize,
    pub font_path: PathBuf,
}

impl RenderPlan {
    pub fn text_overlays(&self) -> impl Iterator<Item = &TextOverlay> {
        self.overlays.iter().filter_map(|overlay| match overlay {
            Overlay::Text(text) => Some(text),
            Overlay::Image(_) => None,
        })
    }

    pub fn logo(&self) -> Option<&LogoOverlay> {
        self.overlays.iter().find_map(|overlay| match overlay {
            Overlay::Image(logo) => Some(logo),
            Overlay::Text(_) => None,
        })
    }
}

/// Inputs for one plan, borrowed from the orchestrator.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub clip: &'a Path,
    pub audio: &'a Path,
    pub logo: Option<&'a Path>,
    pub output_path: PathBuf,
    pub title_lines: &'a [String],
    pub part: Option<PartLabel>,
    pub captions: &'a CaptionTrack,
    pub attribution: Option<Attribution>,
    pub duration: DurationPlan,
    pub audio_duration: f64,
    pub clip_offset: f64,
}

/// Pairs caption texts with their windows. Counts must match exactly.
pub fn pair_caption_units(track: &CaptionTrack) -> ReelResult<Vec<CaptionUnit>> {
    if track.texts.len() != track.windows.len() {
        return Err(ReelError::WindowCountMismatch {
            units: track.texts.len(),
            windows: track.windows.len(),
        });
    }

    Ok(track
        .texts
        .iter()
        .zip(&track.windows)
        .map(|(text, window)| CaptionUnit {
            text: text.clone(),
            visibility_window: *window,
        })
        .collect())
}

pub struct RenderPlanAssembler<'a> {
    config: &'a ReelConfig,
}

impl<'a> RenderPlanAssembler<'a> {
    pub fn new(config: &'a ReelConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, request: PlanRequest<'_>) -> ReelResult<RenderPlan> {
        let captions = pair_caption_units(request.captions)?;
        let mut overlays = Vec::new();

        let title_style = self.style(self.config.title_font_size);
        let line_height = title_style.font_size * 6 / 5;
        for (line, text) in request.title_lines.iter().enumerate() {
            overlays.push(Overlay::Text(TextOverlay {
                role: OverlayRole::Title,
                text: DrawText::new(text),
                position: Anchor::Top {
                    y: TITLE_TOP_MARGIN + line as u32 * line_height,
                },
                style: title_style,
                visibility_window: None,
            }));
        }

        if let Some(part) = request.part.filter(|part| part.total > 1) {
            overlays.push(Overlay::Text(TextOverlay {
                role: OverlayRole::PartLabel,
                text: DrawText::new(&part.text()),
                position: Anchor::Bottom {
                    margin: PART_LABEL_MARGIN,
                },
                style: self.style(self.config.part_label_font_size),
                visibility_window: None,
            }));
        }

        let caption_style = self.style(self.config.caption_font_size);
        for unit in &captions {
            overlays.push(Overlay::Text(TextOverlay {
                role: OverlayRole::Caption,
                text: DrawText::new(&unit.text),
                position: Anchor::Middle,
                style: caption_style,
                visibility_window: Some(unit.visibility_window),
            }));
        }

        if let Some(attribution) = &request.attribution {
            let position = match attribution.window {
                Some(_) => Anchor::Middle,
                None => Anchor::Bottom {
                    margin: self.attribution_margin(),
                },
            };
            overlays.push(Overlay::Text(TextOverlay {
                role: OverlayRole::Attribution,
                text: DrawText::new(&attribution.text),
                position,
                style: self.style(self.config.attribution_font_size),
                visibility_window: attribution.window,
            }));
        }

        if let Some(branding) = self.branding_text() {
            overlays.push(Overlay::Text(TextOverlay {
                role: OverlayRole::Branding,
                text: DrawText::new(branding),
                position: Anchor::Bottom {
                    margin: BOTTOM_MARGIN,
                },
                style: self.style(self.config.branding_font_size),
                visibility_window: None,
            }));
        }

        if request.logo.is_some() {
            overlays.push(Overlay::Image(LogoOverlay {
                input_index: PlanInputs::LOGO,
                height: self.config.branding_font_size,
            }));
        }

        Ok(RenderPlan {
            inputs: PlanInputs {
                clip: request.clip.to_path_buf(),
                audio: request.audio.to_path_buf(),
                logo: request.logo.map(Path::to_path_buf),
            },
            overlays,
            output_path: request.output_path,
            duration: request.duration,
            audio_duration: request.audio_duration,
            clip_offset: request.clip_offset,
            audio_gain: self.config.audio_gain,
            frame: FrameSize {
                width: self.config.width,
                height: self.config.height,
            },
            font_path: self.config.font_path.clone(),
        })
    }

    fn style(&self, font_size: u32) -> TextStyle {
        TextStyle {
            font_size,
            border_width: self.config.border_width,
            boxed: self.config.boxed_text,
        }
    }

    fn branding_text(&self) -> Option<&str> {
        self.config
            .branding_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    // A pinned attribution sits above the branding line when both are shown.
    fn attribution_margin(&self) -> u32 {
        match self.branding_text() {
            Some(_) => BOTTOM_MARGIN + self.config.branding_font_size * 6 / 5,
            None => BOTTOM_MARGIN,
        }
    }
}
