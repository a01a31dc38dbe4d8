pub mod ffmpeg;
pub mod pipeline;
pub mod plan;
pub mod text;

pub use self::ffmpeg::compiler::FfmpegCompiler;
pub use self::ffmpeg::services::{FfmpegRunner, SystemFfmpegRunner};
pub use self::pipeline::{RenderPipeline, RenderPipelineParams};
pub use self::plan::{RenderPlan, RenderPlanAssembler};
