use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::ui::prelude::Level;

use crate::reel::error::{ReelError, ReelResult};
use crate::reel::logging::log_event;
use crate::reel::render::ffmpeg::compiler::{FfmpegCompileOutput, FfmpegCompiler, FilterSource};
use crate::reel::render::ffmpeg::services::{FfmpegRunOptions, FfmpegRunner};
use crate::reel::render::plan::RenderPlan;

/// Turns render plans into ffmpeg invocations.
pub struct RenderPipeline<'a> {
    compiler: FfmpegCompiler,
    runner: &'a dyn FfmpegRunner,
    inline_filter_limit: usize,
    verbose: bool,
    timeout: Option<Duration>,
}

pub struct RenderPipelineParams<'a> {
    pub compiler: FfmpegCompiler,
    pub runner: &'a dyn FfmpegRunner,
    pub inline_filter_limit: usize,
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

impl<'a> RenderPipeline<'a> {
    pub fn new(params: RenderPipelineParams<'a>) -> Self {
        Self {
            compiler: params.compiler,
            runner: params.runner,
            inline_filter_limit: params.inline_filter_limit,
            verbose: params.verbose,
            timeout: params.timeout,
        }
    }

    /// Shell-quoted command line that `execute` would run, graph inline.
    pub fn command_line(&self, plan: &RenderPlan) -> String {
        let output = self.compiler.compile(plan, &FilterSource::Inline);
        let mut words = Vec::with_capacity(output.args.len() + 1);
        words.push("ffmpeg".to_string());
        words.extend(output.args);
        shell_words::join(words)
    }

    pub fn execute(&self, plan: &RenderPlan) -> ReelResult<()> {
        let filter_graph = self.compiler.filter_graph(plan);

        // The script file has to outlive the ffmpeg run.
        let (output, _script) = if filter_graph.len() > self.inline_filter_limit {
            let script = write_filter_script(&filter_graph)?;
            let source = FilterSource::Script(script.path().to_path_buf());
            (self.compiler.compile(plan, &source), Some(script))
        } else {
            (self.compiler.compile(plan, &FilterSource::Inline), None)
        };

        if let Err(err) = self.run(plan, &output) {
            discard_partial_output(&plan.output_path);
            return Err(err);
        }

        if !plan.output_path.exists() {
            return Err(ReelError::MissingOutput(plan.output_path.clone()));
        }
        Ok(())
    }

    fn run(&self, plan: &RenderPlan, output: &FfmpegCompileOutput) -> ReelResult<()> {
        let options = FfmpegRunOptions::new(Some(plan.audio_duration), self.verbose)
            .with_timeout(self.timeout);
        self.runner.run(&output.args, options)
    }
}

// A failed or killed ffmpeg may leave a truncated file under the part's name.
fn discard_partial_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log_event(
            Level::Warn,
            "reel.part.discarded",
            format!("Removed incomplete output {}", path.display()),
        ),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log_event(
            Level::Warn,
            "reel.part.discarded",
            format!("Could not remove incomplete output {}: {err}", path.display()),
        ),
    }
}

fn write_filter_script(filter_graph: &str) -> ReelResult<NamedTempFile> {
    let mut script = tempfile::Builder::new()
        .prefix("shortsmith-filter-")
        .suffix(".txt")
        .tempfile()
        .map_err(ReelError::FilterScript)?;
    script
        .write_all(filter_graph.as_bytes())
        .and_then(|()| script.flush())
        .map_err(ReelError::FilterScript)?;
    Ok(script)
}
