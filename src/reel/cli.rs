use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::config::Preset;

#[derive(Subcommand, Debug, Clone)]
pub enum ReelCommands {
    /// Render one short video per narration chunk of a job file
    Render(RenderArgs),
    /// Show how text would be wrapped into caption or title lines
    Wrap(WrapArgs),
    /// Print the duration of a media file as reported by ffprobe
    Probe(ProbeArgs),
    /// Inspect or create the reel configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// JSON job file with the title, attribution and narration chunks
    #[arg(value_hint = ValueHint::FilePath)]
    pub job: PathBuf,

    /// Background clip looped behind the captions
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub clip: PathBuf,

    /// Logo image overlaid in the bottom-left corner
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub logo: Option<PathBuf>,

    /// Apply a platform preset on top of the loaded configuration
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory the rendered parts are written to
    #[arg(short = 'o', long = "out-dir", value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Known clip duration in seconds; skips probing the clip
    #[arg(long)]
    pub clip_duration: Option<f64>,

    /// Kill ffmpeg if a single part takes longer than this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Stream ffmpeg's own output while rendering
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WrapArgs {
    /// Text to wrap
    pub text: String,

    /// Maximum characters per line
    #[arg(long, default_value_t = 20)]
    pub width: usize,

    /// Apply the title rules (line cap with ellipsis)
    #[arg(long)]
    pub title: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Audio or video file to probe
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show {
        /// Show the preset applied to the stored configuration
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },
    /// Print the configuration file location
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Start from a preset instead of the plain defaults
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },
}
