use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::common::progress::create_spinner;
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

use super::cli::{ConfigCommands, ProbeArgs, ReelCommands, RenderArgs, WrapArgs};
use super::config::{ReelConfig, reel_config_path};
use super::job::ReelJob;
use super::layout::{wrap_text, wrap_title};
use super::orchestrator::{ReelSources, SegmentOrchestrator, SegmentOrchestratorParams};
use super::render::SystemFfmpegRunner;
use super::support::ffmpeg::{FfprobeProbe, MediaProbe};

const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

pub fn handle_reel_command(command: ReelCommands) -> Result<()> {
    match command {
        ReelCommands::Render(args) => handle_render(args),
        ReelCommands::Wrap(args) => handle_wrap(args),
        ReelCommands::Probe(args) => handle_probe(args),
        ReelCommands::Config { command } => handle_config(command),
    }
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ReelConfig::load_from_path(path)?,
        None => ReelConfig::load()?,
    };
    if let Some(preset) = args.preset {
        config = config.with_preset(preset);
    }
    config.font_path = expand_path(&config.font_path);

    let job = ReelJob::load(&args.job)?;

    if !args.clip.exists() {
        bail!("Background clip {} does not exist", args.clip.display());
    }
    if let Some(logo) = &args.logo
        && !logo.exists()
    {
        bail!("Logo {} does not exist", logo.display());
    }
    if !args.dry_run {
        ensure_tools_available()?;
    }

    let output_dir = expand_path(args.out_dir.as_ref().unwrap_or(&config.output_dir));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    emit(
        Level::Debug,
        "reel.render.config",
        &format!(
            "Rendering {} chunk(s) into {} ({:?} captions, {:?} loop)",
            job.chunks.len(),
            output_dir.display(),
            config.caption_mode,
            config.loop_mode
        ),
        None,
    );

    let probe = FfprobeProbe;
    let runner = SystemFfmpegRunner;
    let orchestrator = SegmentOrchestrator::new(SegmentOrchestratorParams {
        config: &config,
        probe: &probe,
        runner: &runner,
        dry_run: args.dry_run,
        verbose: args.verbose,
        timeout: args
            .timeout
            .or(config.render_timeout_secs)
            .map(Duration::from_secs),
    });

    let sources = ReelSources {
        clip: &args.clip,
        logo: args.logo.as_deref(),
        clip_duration: args.clip_duration,
        output_dir: &output_dir,
    };

    let parts = orchestrator
        .run(&job, &sources)
        .with_context(|| format!("Failed to render {}", args.job.display()))?;

    let outputs: Vec<_> = parts
        .iter()
        .map(|part| {
            json!({
                "part": part.index,
                "total": part.total,
                "path": part.output,
                "duration": part.plan.audio_duration,
            })
        })
        .collect();
    let message = if args.dry_run {
        format!("Planned {} part(s); nothing was rendered", parts.len())
    } else {
        format!("Rendered {} part(s) into {}", parts.len(), output_dir.display())
    };
    emit(
        Level::Success,
        "reel.render.done",
        &message,
        Some(json!({ "outputs": outputs, "dry_run": args.dry_run })),
    );

    Ok(())
}

fn handle_wrap(args: WrapArgs) -> Result<()> {
    let lines = if args.title {
        wrap_title(&args.text, args.width)?
    } else {
        wrap_text(&args.text, args.width)?
            .iter()
            .map(|line| line.text())
            .collect()
    };

    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "reel.wrap",
            &format!("{} line(s)", lines.len()),
            Some(json!({ "lines": lines })),
        ),
        OutputFormat::Text => {
            for line in &lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn handle_probe(args: ProbeArgs) -> Result<()> {
    which::which("ffprobe").context("ffprobe was not found on PATH")?;

    let spinner = create_spinner(format!("Probing {}", args.file.display()));
    let result = FfprobeProbe.duration_seconds(&args.file);
    spinner.finish_and_clear();

    let duration = result.with_context(|| format!("Failed to probe {}", args.file.display()))?;
    emit(
        Level::Info,
        "reel.probe",
        &format!("{}: {duration:.3}s", args.file.display()),
        Some(json!({ "path": args.file, "duration": duration })),
    );
    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show { preset } => {
            let mut config = ReelConfig::load()?;
            if let Some(preset) = preset {
                config = config.with_preset(preset);
            }
            let toml = toml::to_string_pretty(&config).context("serializing reel config")?;
            print!("{toml}");
        }
        ConfigCommands::Path => {
            println!("{}", reel_config_path()?.display());
        }
        ConfigCommands::Init { force, preset } => {
            let path = reel_config_path()?;
            if path.exists() && !force {
                bail!(
                    "Config file {} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            let config = match preset {
                Some(preset) => ReelConfig::for_preset(preset),
                None => ReelConfig::default(),
            };
            config.save_to_path(&path)?;
            emit(
                Level::Success,
                "reel.config.init",
                &format!("Wrote {}", path.display()),
                None,
            );
        }
    }
    Ok(())
}

fn ensure_tools_available() -> Result<()> {
    let missing: Vec<&str> = REQUIRED_TOOLS
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect();
    if !missing.is_empty() {
        bail!("Required tools not found on PATH: {}", missing.join(", "));
    }
    Ok(())
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path(Path::new("~/videos")), home.join("videos"));
        assert_eq!(expand_path(Path::new("out")), PathBuf::from("out"));
    }
}
