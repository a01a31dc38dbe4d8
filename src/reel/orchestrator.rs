//! Drives one job through layout, timing, planning and rendering, one chunk
//! at a time. Chunks share a single background clip; each part picks up the
//! footage where the previous part's narration ended.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Value, json};

use crate::ui::prelude::Level;

use super::config::ReelConfig;
use super::duration::{DurationPlan, LoopMode, plan_indefinite, plan_segment_duration};
use super::error::{ReelError, ReelResult};
use super::job::{ReelJob, SpeechChunk};
use super::layout::{abbreviate_attribution, capitalize_first, output_prefix, wrap_title};
use super::logging::{log_event, log_event_with_data};
use super::naming::{next_available_path, part_prefix};
use super::render::plan::{Attribution, PartLabel, PlanRequest};
use super::render::{
    FfmpegCompiler, FfmpegRunner, RenderPipeline, RenderPipelineParams, RenderPlan,
    RenderPlanAssembler,
};
use super::support::ffmpeg::{EncodeProfile, MediaProbe};
use super::timing::{
    CaptionMode, attribution_window, build_caption_track, check_text_alignment, final_unit_end,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentPhase {
    Idle,
    Processing { part_index: usize },
}

/// Bookkeeping carried across the chunks of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentState {
    /// Narration seconds consumed by the parts rendered so far.
    pub elapsed_seconds: f64,
    pub total_parts: usize,
    pub phase: SegmentPhase,
}

impl SegmentState {
    pub fn new(total_parts: usize) -> Self {
        Self {
            elapsed_seconds: 0.0,
            total_parts,
            phase: SegmentPhase::Idle,
        }
    }

    fn begin(&mut self, part_index: usize) {
        self.phase = SegmentPhase::Processing { part_index };
    }

    fn complete(&mut self, narration_end: f64) {
        self.elapsed_seconds += narration_end;
        self.phase = SegmentPhase::Idle;
    }

    fn abort(&mut self) {
        self.phase = SegmentPhase::Idle;
    }
}

/// Media shared by every part of a job.
#[derive(Debug, Clone)]
pub struct ReelSources<'a> {
    pub clip: &'a Path,
    pub logo: Option<&'a Path>,
    /// Known clip length; skips probing the clip when present.
    pub clip_duration: Option<f64>,
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone)]
pub struct RenderedPart {
    pub index: usize,
    pub total: usize,
    pub output: PathBuf,
    pub plan: RenderPlan,
}

pub struct SegmentOrchestrator<'a> {
    config: &'a ReelConfig,
    probe: &'a dyn MediaProbe,
    runner: &'a dyn FfmpegRunner,
    dry_run: bool,
    verbose: bool,
    timeout: Option<Duration>,
}

pub struct SegmentOrchestratorParams<'a> {
    pub config: &'a ReelConfig,
    pub probe: &'a dyn MediaProbe,
    pub runner: &'a dyn FfmpegRunner,
    pub dry_run: bool,
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

// Job-wide values computed once before the first chunk.
struct JobLayout {
    title_lines: Vec<String>,
    base_prefix: String,
    attribution: Option<String>,
}

struct RunContext<'r> {
    layout: JobLayout,
    sources: &'r ReelSources<'r>,
    pipeline: RenderPipeline<'r>,
    clip_duration: Cell<Option<f64>>,
}

impl<'a> SegmentOrchestrator<'a> {
    pub fn new(params: SegmentOrchestratorParams<'a>) -> Self {
        Self {
            config: params.config,
            probe: params.probe,
            runner: params.runner,
            dry_run: params.dry_run,
            verbose: params.verbose,
            timeout: params.timeout,
        }
    }

    /// Renders every chunk in order. The first failing chunk stops the run;
    /// parts already written stay on disk.
    pub fn run(&self, job: &ReelJob, sources: &ReelSources<'_>) -> ReelResult<Vec<RenderedPart>> {
        let total = job.chunks.len();
        let pipeline = RenderPipeline::new(RenderPipelineParams {
            compiler: FfmpegCompiler::new(EncodeProfile::new(
                self.config.video_codec.clone(),
                self.config.audio_codec.clone(),
            )),
            runner: self.runner,
            inline_filter_limit: self.config.inline_filter_limit,
            verbose: self.verbose,
            timeout: self.timeout,
        });
        let context = RunContext {
            layout: self.job_layout(job)?,
            sources,
            pipeline,
            clip_duration: Cell::new(sources.clip_duration),
        };

        let mut state = SegmentState::new(total);
        let mut parts = Vec::with_capacity(total);

        for (position, chunk) in job.chunks.iter().enumerate() {
            let index = position + 1;
            state.begin(index);
            log_event(
                Level::Info,
                "reel.part.start",
                format!(
                    "Rendering part {index} of {} from {:.2}s of narration",
                    state.total_parts, state.elapsed_seconds
                ),
            );

            let rendered = self.render_chunk(
                &context,
                chunk,
                PartLabel { index, total },
                state.elapsed_seconds,
            );

            match rendered {
                Ok(part) => {
                    state.complete(final_unit_end(&chunk.words));
                    let verb = if self.dry_run { "Planned" } else { "Wrote" };
                    log_event(
                        Level::Success,
                        "reel.part.done",
                        format!("{verb} part {index} of {total}: {}", part.output.display()),
                    );
                    parts.push(part);
                }
                Err(err) => {
                    state.abort();
                    let err = err.in_chunk(index, total);
                    log_event_with_data(
                        Level::Error,
                        "reel.part.failed",
                        err.to_string(),
                        json!({
                            "index": index,
                            "total": total,
                            "kind": err.kind().as_str(),
                            "cause": err.cause(),
                        }),
                    );
                    if !parts.is_empty() && !self.dry_run {
                        log_event(
                            Level::Warn,
                            "reel.part.kept",
                            format!("Kept {} completed part(s) on disk", parts.len()),
                        );
                    }
                    return Err(err);
                }
            }
        }

        Ok(parts)
    }

    fn job_layout(&self, job: &ReelJob) -> ReelResult<JobLayout> {
        let title = capitalize_first(job.title.trim());
        let title_lines = if title.is_empty() {
            Vec::new()
        } else {
            wrap_title(&title, self.config.title_chars_per_line)?
        };

        let attribution = job
            .attribution
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| format!("- {}", abbreviate_attribution(name)));

        Ok(JobLayout {
            title_lines,
            base_prefix: output_prefix(&title, self.config.prefix_max_chars),
            attribution,
        })
    }

    fn render_chunk(
        &self,
        context: &RunContext<'_>,
        chunk: &SpeechChunk,
        part: PartLabel,
        elapsed_seconds: f64,
    ) -> ReelResult<RenderedPart> {
        let (layout, sources) = (&context.layout, context.sources);

        if chunk.words.is_empty() {
            return Err(ReelError::NoWords);
        }
        if let Some(text) = &chunk.text {
            check_text_alignment(text, &chunk.words)?;
        }

        let captions = build_caption_track(
            &chunk.words,
            self.config.caption_mode,
            self.config.caption_chars_per_line,
        )?;

        let audio_duration = match chunk.audio_duration {
            Some(duration) => duration,
            None => self.probe.duration_seconds(&chunk.audio)?,
        };

        let clip_offset = self.config.clip_lead_in + elapsed_seconds;
        let duration = self.duration_plan(context, audio_duration, clip_offset)?;
        log_event_with_data(
            Level::Debug,
            "reel.part.duration",
            format!(
                "Part {}: {:.2}s of narration from clip offset {clip_offset:.2}s",
                part.index, audio_duration
            ),
            json!({
                "loop_count": duration.loop_count,
                "stream_loop": duration.stream_loop_arg(),
                "looped_footage": duration.looped_footage(),
            }),
        );

        let attribution = match &layout.attribution {
            Some(text) => Some(Attribution {
                text: text.clone(),
                window: match self.config.caption_mode {
                    CaptionMode::Words => Some(attribution_window(
                        captions.last_end().unwrap_or(0.0),
                        audio_duration,
                    )?),
                    CaptionMode::Lines => None,
                },
            }),
            None => None,
        };

        let prefix = part_prefix(&layout.base_prefix, part.index, part.total);
        let output_path =
            next_available_path(sources.output_dir, &prefix, &self.config.dotted_extension())?;

        let plan = RenderPlanAssembler::new(self.config).assemble(PlanRequest {
            clip: sources.clip,
            audio: &chunk.audio,
            logo: sources.logo,
            output_path: output_path.clone(),
            title_lines: &layout.title_lines,
            part: Some(part),
            captions: &captions,
            attribution,
            duration,
            audio_duration,
            clip_offset,
        })?;

        if self.dry_run {
            log_event_with_data(
                Level::Info,
                "reel.part.plan",
                context.pipeline.command_line(&plan),
                json!({
                    "part": part.index,
                    "total": part.total,
                    "plan": serde_json::to_value(&plan).unwrap_or(Value::Null),
                }),
            );
        } else {
            context.pipeline.execute(&plan)?;
        }

        Ok(RenderedPart {
            index: part.index,
            total: part.total,
            output: output_path,
            plan,
        })
    }

    // The clip is probed at most once per run.
    fn duration_plan(
        &self,
        context: &RunContext<'_>,
        audio_duration: f64,
        clip_offset: f64,
    ) -> ReelResult<DurationPlan> {
        match self.config.loop_mode {
            LoopMode::Indefinite => plan_indefinite(audio_duration),
            LoopMode::Counted => {
                let clip_seconds = match context.clip_duration.get() {
                    Some(seconds) => seconds,
                    None => {
                        let seconds = self.probe.duration_seconds(context.sources.clip)?;
                        context.clip_duration.set(Some(seconds));
                        seconds
                    }
                };
                plan_segment_duration(audio_duration, clip_seconds, clip_offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;

    use crate::reel::error::ErrorKind;
    use crate::reel::render::ffmpeg::services::FfmpegRunOptions;
    use crate::reel::render::plan::{Anchor, OverlayRole};
    use crate::reel::timing::{TimeWindow, WordTiming};
    use tempfile::tempdir;

    struct FakeProbe {
        durations: HashMap<PathBuf, f64>,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeProbe {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                durations: entries
                    .iter()
                    .map(|(path, d)| (PathBuf::from(path), *d))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MediaProbe for FakeProbe {
        fn duration_seconds(&self, path: &Path) -> ReelResult<f64> {
            self.calls.borrow_mut().push(path.to_path_buf());
            self.durations
                .get(path)
                .copied()
                .ok_or_else(|| ReelError::ProbeFailed {
                    path: path.to_path_buf(),
                    diagnostics: "No such file or directory".to_string(),
                })
        }
    }

    /// Writes the output file for every call except the one numbered `fail_on`.
    /// With `timeout_on` the output is written and the call then times out.
    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<usize>,
        fail_on: Option<usize>,
        timeout_on: Option<usize>,
    }

    impl FfmpegRunner for FakeRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> ReelResult<()> {
            let mut calls = self.calls.borrow_mut();
            *calls += 1;
            if self.fail_on == Some(*calls) {
                return Err(ReelError::from_exit_status(Some(1), "Invalid argument"));
            }
            if self.timeout_on == Some(*calls) {
                fs::write(args.last().unwrap(), b"trunc").unwrap();
                return Err(ReelError::RendererTimeout {
                    timeout: Duration::from_secs(1),
                });
            }
            fs::write(args.last().unwrap(), b"video").unwrap();
            Ok(())
        }
    }

    fn chunk(audio: &str, words: &[(&str, f64, f64)]) -> SpeechChunk {
        SpeechChunk {
            audio: PathBuf::from(audio),
            words: words
                .iter()
                .map(|(w, s, e)| WordTiming::new(*w, *s, *e))
                .collect(),
            text: None,
            audio_duration: None,
        }
    }

    fn three_part_job() -> ReelJob {
        ReelJob {
            title: "my story".to_string(),
            attribution: None,
            chunks: vec![
                chunk("a.mp3", &[("one", 0.0, 2.0), ("two", 2.0, 4.2)]),
                chunk("b.mp3", &[("three", 0.0, 3.0)]),
                chunk("c.mp3", &[("four", 0.0, 1.0), ("five", 1.5, 5.5)]),
            ],
        }
    }

    fn probe() -> FakeProbe {
        FakeProbe::new(&[
            ("clip.mp4", 10.0),
            ("a.mp3", 4.5),
            ("b.mp3", 3.2),
            ("c.mp3", 5.8),
        ])
    }

    fn orchestrator<'a>(
        config: &'a ReelConfig,
        probe: &'a FakeProbe,
        runner: &'a FakeRunner,
        dry_run: bool,
    ) -> SegmentOrchestrator<'a> {
        SegmentOrchestrator::new(SegmentOrchestratorParams {
            config,
            probe,
            runner,
            dry_run,
            verbose: false,
            timeout: None,
        })
    }

    fn sources(dir: &Path) -> ReelSources<'_> {
        ReelSources {
            clip: Path::new("clip.mp4"),
            logo: None,
            clip_duration: None,
            output_dir: dir,
        }
    }

    #[test]
    fn elapsed_time_carries_across_parts() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();

        let parts = orchestrator(&config, &probe, &runner, false)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap();

        let offsets: Vec<f64> = parts.iter().map(|p| p.plan.clip_offset).collect();
        let expected = [0.0, 4.2, 7.2];
        for (offset, want) in offsets.iter().zip(expected) {
            assert!((offset - want).abs() < 1e-9, "{offsets:?}");
        }

        let names: Vec<String> = parts
            .iter()
            .map(|p| p.output.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "MystoryPart1of3_1.mp4",
                "MystoryPart2of3_1.mp4",
                "MystoryPart3of3_1.mp4"
            ]
        );
        assert!(parts.iter().all(|p| p.output.exists()));
        assert_eq!(*runner.calls.borrow(), 3);
    }

    #[test]
    fn clip_is_probed_once_and_loops_cover_the_offset() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();

        let parts = orchestrator(&config, &probe, &runner, false)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap();

        let clip_probes = probe
            .calls
            .borrow()
            .iter()
            .filter(|p| p.as_path() == Path::new("clip.mp4"))
            .count();
        assert_eq!(clip_probes, 1);

        // Third part: 5.8s of audio starting 7.2s into a 10s clip.
        let third = &parts[2].plan.duration;
        assert_eq!(third.loop_count, 1);
        assert!((third.target_duration - 13.0).abs() < 1e-9);
    }

    #[test]
    fn failing_chunk_aborts_the_rest_and_keeps_earlier_parts() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner {
            fail_on: Some(2),
            ..Default::default()
        };

        let err = orchestrator(&config, &probe, &runner, false)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap_err();

        assert!(matches!(
            err,
            ReelError::ChunkFailed {
                index: 2,
                total: 3,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert_eq!(*runner.calls.borrow(), 2);
        assert!(dir.path().join("MystoryPart1of3_1.mp4").exists());
        assert!(!dir.path().join("MystoryPart3of3_1.mp4").exists());
    }

    #[test]
    fn timed_out_part_leaves_only_completed_parts() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner {
            timeout_on: Some(2),
            ..Default::default()
        };

        let err = orchestrator(&config, &probe, &runner, false)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap_err();

        assert_eq!(err.cause(), "renderer_timeout");
        assert_eq!(
            err.to_string(),
            "Part 2 of 3 failed: ffmpeg did not finish within 1s"
        );
        let mut on_disk: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, ["MystoryPart1of3_1.mp4"]);
    }

    #[test]
    fn dry_run_never_invokes_the_renderer() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();

        let parts = orchestrator(&config, &probe, &runner, true)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(*runner.calls.borrow(), 0);
        assert!(!parts[0].output.exists());
        assert!((parts[2].plan.clip_offset - 7.2).abs() < 1e-9);
    }

    #[test]
    fn single_chunk_has_plain_name_and_no_part_label() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Mystory1.mp4"), b"old").unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();
        let mut job = three_part_job();
        job.chunks.truncate(1);

        let parts = orchestrator(&config, &probe, &runner, false)
            .run(&job, &sources(dir.path()))
            .unwrap();

        assert_eq!(parts[0].output, dir.path().join("Mystory2.mp4"));
        assert!(
            !parts[0]
                .plan
                .text_overlays()
                .any(|o| o.role == OverlayRole::PartLabel)
        );
    }

    #[test]
    fn words_mode_attribution_fills_the_tail_of_the_audio() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();
        let mut job = three_part_job();
        job.chunks.truncate(1);
        job.attribution = Some("Alexander Graham Bell Junior".to_string());

        let parts = orchestrator(&config, &probe, &runner, true)
            .run(&job, &sources(dir.path()))
            .unwrap();

        let attribution = parts[0]
            .plan
            .text_overlays()
            .find(|o| o.role == OverlayRole::Attribution)
            .unwrap();
        assert_eq!(attribution.text.as_str(), "- Alexander Junior");
        assert_eq!(
            attribution.visibility_window,
            Some(TimeWindow::new(4.2, 4.5))
        );
    }

    #[test]
    fn lines_mode_pins_attribution_and_groups_words() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::for_preset(crate::reel::config::Preset::Quote);
        let probe = probe();
        let runner = FakeRunner::default();
        let mut job = three_part_job();
        job.chunks.truncate(1);
        job.attribution = Some("Seneca".to_string());

        let parts = orchestrator(&config, &probe, &runner, true)
            .run(&job, &sources(dir.path()))
            .unwrap();

        let plan = &parts[0].plan;
        let captions: Vec<&str> = plan
            .text_overlays()
            .filter(|o| o.role == OverlayRole::Caption)
            .map(|o| o.text.as_str())
            .collect();
        assert_eq!(captions, vec!["one two"]);

        let attribution = plan
            .text_overlays()
            .find(|o| o.role == OverlayRole::Attribution)
            .unwrap();
        assert_eq!(attribution.visibility_window, None);
        assert_eq!(attribution.position, Anchor::Bottom { margin: 50 });
    }

    #[test]
    fn lead_in_shifts_every_offset() {
        let dir = tempdir().unwrap();
        let mut config = ReelConfig::default();
        config.clip_lead_in = 60.0;
        let probe = probe();
        let runner = FakeRunner::default();

        let parts = orchestrator(&config, &probe, &runner, true)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap();

        assert!((parts[0].plan.clip_offset - 60.0).abs() < 1e-9);
        assert!((parts[1].plan.clip_offset - 64.2).abs() < 1e-9);
    }

    #[test]
    fn known_durations_skip_probing() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = FakeProbe::new(&[]);
        let runner = FakeRunner::default();
        let mut job = three_part_job();
        for c in &mut job.chunks {
            c.audio_duration = Some(6.0);
        }
        let mut sources = sources(dir.path());
        sources.clip_duration = Some(10.0);

        orchestrator(&config, &probe, &runner, true)
            .run(&job, &sources)
            .unwrap();
        assert!(probe.calls.borrow().is_empty());
    }

    #[test]
    fn probe_failure_is_reported_with_its_part() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = FakeProbe::new(&[("clip.mp4", 10.0), ("a.mp3", 4.5)]);
        let runner = FakeRunner::default();

        let err = orchestrator(&config, &probe, &runner, false)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap_err();
        assert!(err.to_string().starts_with("Part 2 of 3 failed: ffprobe failed"));
    }

    #[test]
    fn empty_chunk_and_text_mismatch_are_input_errors() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::default();
        let probe = probe();
        let runner = FakeRunner::default();

        let mut job = three_part_job();
        job.chunks[0].words.clear();
        let err = orchestrator(&config, &probe, &runner, false)
            .run(&job, &sources(dir.path()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputContract);

        let mut job = three_part_job();
        job.chunks[0].text = Some("one two three".to_string());
        let err = orchestrator(&config, &probe, &runner, false)
            .run(&job, &sources(dir.path()))
            .unwrap_err();
        assert!(matches!(
            err,
            ReelError::ChunkFailed { index: 1, ref source, .. }
                if matches!(**source, ReelError::UnitCountMismatch { text_words: 3, timings: 2 })
        ));
        assert_eq!(*runner.calls.borrow(), 0);
    }

    #[test]
    fn indefinite_mode_never_probes_the_clip() {
        let dir = tempdir().unwrap();
        let config = ReelConfig::for_preset(crate::reel::config::Preset::Youtube);
        let probe = FakeProbe::new(&[("a.mp3", 4.5), ("b.mp3", 3.2), ("c.mp3", 5.8)]);
        let runner = FakeRunner::default();

        let parts = orchestrator(&config, &probe, &runner, true)
            .run(&three_part_job(), &sources(dir.path()))
            .unwrap();
        assert!(parts.iter().all(|p| p.plan.duration.stream_loop_arg() == -1));
    }

    #[test]
    fn segment_state_tracks_phase() {
        let mut state = SegmentState::new(2);
        state.begin(1);
        assert_eq!(state.phase, SegmentPhase::Processing { part_index: 1 });
        state.complete(4.2);
        assert_eq!(state.phase, SegmentPhase::Idle);
        assert!((state.elapsed_seconds - 4.2).abs() < 1e-9);
    }
}
