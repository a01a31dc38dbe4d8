use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

use super::duration::LoopMode;
use super::timing::CaptionMode;

/// Named bundles of defaults matching the platforms the tool targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Quote card: wrapped caption lines, boxed text, no logo.
    Quote,
    /// Word-by-word captions with an attribution card and endless clip loop.
    Youtube,
    /// Word-by-word captions, part labels, and footage that skips the intro.
    Tiktok,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Output frame width in pixels
    pub width: u32,
    /// Output frame height in pixels
    pub height: u32,
    /// Font file used by every text overlay
    pub font_path: PathBuf,
    pub title_font_size: u32,
    pub caption_font_size: u32,
    pub attribution_font_size: u32,
    pub branding_font_size: u32,
    pub part_label_font_size: u32,
    /// Outline thickness around text
    pub border_width: u32,
    /// Draw a translucent box behind text instead of an outline
    pub boxed_text: bool,
    pub title_chars_per_line: usize,
    pub caption_chars_per_line: usize,
    pub caption_mode: CaptionMode,
    /// Channel name shown at the bottom of every frame
    pub branding_text: Option<String>,
    /// Narration volume multiplier
    pub audio_gain: f32,
    /// Seconds of background footage skipped before the first part
    pub clip_lead_in: f64,
    pub loop_mode: LoopMode,
    pub output_dir: PathBuf,
    pub output_extension: String,
    /// Title characters kept when deriving output file names
    pub prefix_max_chars: usize,
    pub video_codec: String,
    pub audio_codec: String,
    /// Filter graphs longer than this are passed to ffmpeg as a script file
    pub inline_filter_limit: usize,
    /// Kill ffmpeg after this many seconds
    pub render_timeout_secs: Option<u64>,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            font_path: PathBuf::from("fonts/PermanentMarker-Regular.ttf"),
            title_font_size: 110,
            caption_font_size: 100,
            attribution_font_size: 100,
            branding_font_size: 100,
            part_label_font_size: 80,
            border_width: Self::DEFAULT_BORDER_WIDTH,
            boxed_text: false,
            title_chars_per_line: 15,
            caption_chars_per_line: 20,
            caption_mode: CaptionMode::Words,
            branding_text: None,
            audio_gain: Self::DEFAULT_AUDIO_GAIN,
            clip_lead_in: 0.0,
            loop_mode: LoopMode::Counted,
            output_dir: PathBuf::from("edited-videos"),
            output_extension: "mp4".to_string(),
            prefix_max_chars: 25,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            inline_filter_limit: 8192,
            render_timeout_secs: None,
        }
    }
}

impl ReelConfig {
    pub const DEFAULT_AUDIO_GAIN: f32 = 2.0;
    pub const DEFAULT_BORDER_WIDTH: u32 = 5;

    pub fn for_preset(preset: Preset) -> Self {
        Self::default().with_preset(preset)
    }

    /// Overrides the fields that differ between platforms and keeps the rest.
    pub fn with_preset(mut self, preset: Preset) -> Self {
        match preset {
            Preset::Quote => {
                self.font_path = PathBuf::from("fonts/Fredoka-VariableFont_wdth,wght.ttf");
                self.caption_mode = CaptionMode::Lines;
                self.boxed_text = true;
                self.border_width = 10;
                self.loop_mode = LoopMode::Counted;
                self.clip_lead_in = 0.0;
            }
            Preset::Youtube => {
                self.caption_mode = CaptionMode::Words;
                self.boxed_text = false;
                self.loop_mode = LoopMode::Indefinite;
                self.clip_lead_in = 0.0;
            }
            Preset::Tiktok => {
                self.caption_mode = CaptionMode::Words;
                self.boxed_text = false;
                self.loop_mode = LoopMode::Counted;
                self.clip_lead_in = 60.0;
            }
        }
        self
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(reel_config_path()?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading reel config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents).context("parsing reel config")?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating reel config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing reel config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing reel config to {}", path.display()))?;
        Ok(())
    }

    /// Replaces values that would produce a broken filter graph with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.audio_gain.is_finite() || self.audio_gain <= 0.0 {
            self.audio_gain = Self::DEFAULT_AUDIO_GAIN;
        }
        if !self.clip_lead_in.is_finite() || self.clip_lead_in < 0.0 {
            self.clip_lead_in = 0.0;
        }
        if self.width == 0 || self.height == 0 {
            self.width = defaults.width;
            self.height = defaults.height;
        }
        if self.title_chars_per_line == 0 {
            self.title_chars_per_line = defaults.title_chars_per_line;
        }
        if self.caption_chars_per_line == 0 {
            self.caption_chars_per_line = defaults.caption_chars_per_line;
        }
        if self.prefix_max_chars == 0 {
            self.prefix_max_chars = defaults.prefix_max_chars;
        }
        if self.output_extension.trim().is_empty() {
            self.output_extension = defaults.output_extension;
        }
        self
    }

    /// Output extension with a leading dot.
    pub fn dotted_extension(&self) -> String {
        format!(".{}", self.output_extension.trim().trim_start_matches('.'))
    }
}

pub fn reel_config_path() -> Result<PathBuf> {
    Ok(paths::shortsmith_config_dir()?.join("reel.toml"))
}
