use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::reel::error::{ReelError, ReelResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> ReelResult<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool) -> Self {
        Self {
            total_duration,
            verbose,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What was worth keeping from ffmpeg's stderr.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StderrSummary {
    pub last_line: String,
    pub error_lines: Vec<String>,
}

impl StderrSummary {
    pub fn diagnostics(&self) -> String {
        if self.error_lines.is_empty() {
            self.last_line.clone()
        } else {
            self.error_lines.join("\n")
        }
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> ReelResult<()> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ReelError::Spawn {
                program: "ffmpeg",
                source,
            })?;

        let pb = options.total_duration.map(|duration| {
            let pb = ProgressBar::new((duration * 1000.0) as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>8}/{len:8} ({eta}) {msg}",
            ) {
                pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
            }
            pb.enable_steady_tick(POLL_INTERVAL);
            pb.set_message("rendering".to_string());
            pb
        });

        // Drained on its own thread so a full pipe never stalls ffmpeg while
        // the timeout is being watched.
        let reader = child.stderr.take().map(|stderr| {
            let pb = pb.clone();
            let verbose = options.verbose;
            thread::spawn(move || read_ffmpeg_stderr(stderr, verbose, pb.as_ref()))
        });

        let waited = wait_with_timeout(&mut child, options.timeout);
        let summary = match reader {
            Some(handle) => handle.join().unwrap_or_default(),
            None => StderrSummary::default(),
        };

        let status = match waited {
            Ok(status) => status,
            Err(err) => {
                if let Some(pb) = &pb {
                    pb.abandon_with_message("stopped");
                }
                return Err(err);
            }
        };

        if !status.success() {
            if let Some(pb) = &pb {
                pb.abandon_with_message("failed");
            }
            return Err(ReelError::from_exit_status(
                status.code(),
                &summary.diagnostics(),
            ));
        }

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }

        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> ReelResult<ExitStatus> {
    let io_error = |source| ReelError::ProcessIo {
        program: "ffmpeg",
        source,
    };

    let Some(timeout) = timeout else {
        return child.wait().map_err(io_error);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::RendererTimeout { timeout });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_ffmpeg_stderr<R: Read>(mut stderr: R, verbose: bool, pb: Option<&ProgressBar>) -> StderrSummary {
    let mut summary = StderrSummary::default();
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = match stderr.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.drain(..=pos);
            if !line.is_empty() {
                handle_line(&line, verbose, pb, &mut summary);
            }
        }
    }

    if !accumulated.trim().is_empty() {
        handle_line(accumulated.trim(), verbose, pb, &mut summary);
    }

    summary
}

fn handle_line(line: &str, verbose: bool, pb: Option<&ProgressBar>, summary: &mut StderrSummary) {
    summary.last_line = line.to_string();

    if verbose {
        eprintln!("{line}");
    }

    if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
        summary.error_lines.push(line.to_string());
    }

    if let Some(pb) = pb
        && let Some(progress) = parse_ffmpeg_progress(line)
    {
        pb.set_position((progress * 1000.0) as u64);
        if let Some(speed) = parse_ffmpeg_speed(line) {
            pb.set_message(speed);
        }
    }
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ')?;
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..=speed_end].to_string())
}
