mod inputs;
mod overlays;
mod util;


use std::path::{Path, PathBuf};

use crate::reel::render::plan::{PlanInputs, RenderPlan};
use crate::reel::support::ffmpeg::EncodeProfile;

use self::util::format_time;

const VIDEO_OUTPUT_LABEL: &str = "outv";
const AUDIO_OUTPUT_LABEL: &str = "outa";
const BASE_VIDEO_LABEL: &str = "base";

#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

/// How the filter graph reaches ffmpeg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    Inline,
    /// Graph is read from this file via `-filter_complex_script`.
    Script(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn extend(&mut self, filters: Vec<String>) {
        self.filters.extend(filters);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

pub struct FfmpegCompiler {
    profile: EncodeProfile,
}

impl FfmpegCompiler {
    pub fn new(profile: EncodeProfile) -> Self {
        Self { profile }
    }

    /// Filter graph text for a plan, as passed inline or written to a script.
    pub fn filter_graph(&self, plan: &RenderPlan) -> String {
        let mut filters = FilterChain::new();

        let logo = plan.logo();
        let video_label = if logo.is_some() {
            BASE_VIDEO_LABEL
        } else {
            VIDEO_OUTPUT_LABEL
        };
        filters.push(self.build_video_chain(plan, video_label));
        filters.push(format!(
            "[{}:a]volume={:.2}[{AUDIO_OUTPUT_LABEL}]",
            PlanInputs::AUDIO,
            plan.audio_gain
        ));

        if let Some(logo) = logo {
            filters.extend(self.build_logo_filters(logo, BASE_VIDEO_LABEL, VIDEO_OUTPUT_LABEL));
        }

        filters.join()
    }

    pub fn compile(&self, plan: &RenderPlan, source: &FilterSource) -> FfmpegCompileOutput {
        let mut args = self.input_args(plan);

        match source {
            FilterSource::Inline => {
                args.push("-filter_complex".to_string());
                args.push(self.filter_graph(plan));
            }
            FilterSource::Script(path) => {
                args.push("-filter_complex_script".to_string());
                args.push(path_arg(path));
            }
        }

        args.push("-map".to_string());
        args.push(format!("[{VIDEO_OUTPUT_LABEL}]"));
        args.push("-map".to_string());
        args.push(format!("[{AUDIO_OUTPUT_LABEL}]"));

        self.profile.push_to(&mut args);
        args.push("-y".to_string());
        args.push(path_arg(&plan.output_path));

        FfmpegCompileOutput { args }
    }

    // Background clip cut to the part offset, cover-scaled to the frame, with
    // every text overlay drawn in plan order.
    fn build_video_chain(&self, plan: &RenderPlan, output_label: &str) -> String {
        let (width, height) = (plan.frame.width, plan.frame.height);
        let mut steps = vec![
            format!("trim=start={}", format_time(plan.clip_offset)),
            "setpts=PTS-STARTPTS".to_string(),
            format!("scale={width}:{height}:force_original_aspect_ratio=increase"),
            format!("crop={width}:{height}"),
            "setsar=1".to_string(),
        ];
        steps.extend(
            plan.text_overlays()
                .map(|overlay| self.build_drawtext_filter(plan, overlay)),
        );

        format!(
            "[{}:v]{}[{output_label}]",
            PlanInputs::CLIP,
            steps.join(",")
        )
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
