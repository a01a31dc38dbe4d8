use crate::reel::render::plan::RenderPlan;

use super::FfmpegCompiler;

impl FfmpegCompiler {
    /// Input options in the fixed order clip, narration, logo. The loop
    /// option only applies to the clip.
    pub(super) fn input_args(&self, plan: &RenderPlan) -> Vec<String> {
        let mut args = Vec::new();

        let stream_loop = plan.duration.stream_loop_arg();
        if stream_loop != 0 {
            args.push("-stream_loop".to_string());
            args.push(stream_loop.to_string());
        }
        args.push("-i".to_string());
        args.push(plan.inputs.clip.to_string_lossy().into_owned());

        args.push("-i".to_string());
        args.push(plan.inputs.audio.to_string_lossy().into_owned());

        if let Some(logo) = &plan.inputs.logo {
            args.push("-i".to_string());
            args.push(logo.to_string_lossy().into_owned());
        }

        args
    }
}
