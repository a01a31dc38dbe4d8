use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Broad classification reported with every failed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input handed to the engine. Never retried.
    InputContract,
    /// ffprobe or ffmpeg reported a failure or did not finish in time.
    Collaborator,
    /// The environment cannot support the run (e.g. unreadable output directory).
    Resource,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InputContract => "input_contract",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Resource => "resource",
        }
    }
}

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Text is empty")]
    EmptyText,

    #[error("Maximum line length must be at least 1")]
    ZeroLineLength,

    #[error("Chunk has no word timings")]
    NoWords,

    #[error("Narration has {text_words} words but {timings} word timings were supplied")]
    UnitCountMismatch { text_words: usize, timings: usize },

    #[error("{units} caption units but {windows} visibility windows")]
    WindowCountMismatch { units: usize, windows: usize },

    #[error("Word {index} ('{word}') has an invalid timing {start}..{end}")]
    InvalidTiming {
        index: usize,
        word: String,
        start: f64,
        end: f64,
    },

    #[error("Word {index} starts at {start} which is before the previous word's start {previous}")]
    OutOfOrderTiming {
        index: usize,
        start: f64,
        previous: f64,
    },

    #[error("Audio duration {audio} ends before the last caption at {last_end}")]
    AudioShorterThanCaptions { audio: f64, last_end: f64 },

    #[error("{what} duration must be positive and finite, got {value}")]
    NonPositiveDuration { what: &'static str, value: f64 },

    #[error("ffprobe failed for {path}: {diagnostics}")]
    ProbeFailed { path: PathBuf, diagnostics: String },

    #[error("Could not parse ffprobe duration output '{output}'")]
    ProbeUnparseable { output: String },

    #[error("ffmpeg exited with status {status:?}: {diagnostics}")]
    RendererFailed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("ffmpeg did not finish within {timeout:?}")]
    RendererTimeout { timeout: Duration },

    #[error("ffmpeg reported success but {0} was not created")]
    MissingOutput(PathBuf),

    #[error("Output directory {path} is not usable: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running {program}: {source}")]
    ProcessIo {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write filter script: {0}")]
    FilterScript(#[source] std::io::Error),

    #[error("Part {index} of {total} failed: {source}")]
    ChunkFailed {
        index: usize,
        total: usize,
        #[source]
        source: Box<ReelError>,
    },
}

impl ReelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReelError::EmptyText
            | ReelError::ZeroLineLength
            | ReelError::NoWords
            | ReelError::UnitCountMismatch { .. }
            | ReelError::WindowCountMismatch { .. }
            | ReelError::InvalidTiming { .. }
            | ReelError::OutOfOrderTiming { .. }
            | ReelError::AudioShorterThanCaptions { .. }
            | ReelError::NonPositiveDuration { .. } => ErrorKind::InputContract,
            ReelError::ProbeFailed { .. }
            | ReelError::ProbeUnparseable { .. }
            | ReelError::RendererFailed { .. }
            | ReelError::RendererTimeout { .. }
            | ReelError::MissingOutput(_)
            | ReelError::Spawn { .. }
            | ReelError::ProcessIo { .. } => ErrorKind::Collaborator,
            ReelError::OutputDirectory { .. } | ReelError::FilterScript(_) => ErrorKind::Resource,
            ReelError::ChunkFailed { source, .. } => source.kind(),
        }
    }

    /// Stable name of the underlying failure, so a renderer timeout and a
    /// renderer-reported failure stay distinguishable in event data.
    pub fn cause(&self) -> &'static str {
        match self {
            ReelError::EmptyText => "empty_text",
            ReelError::ZeroLineLength => "zero_line_length",
            ReelError::NoWords => "no_words",
            ReelError::UnitCountMismatch { .. } => "unit_count_mismatch",
            ReelError::WindowCountMismatch { .. } => "window_count_mismatch",
            ReelError::InvalidTiming { .. } => "invalid_timing",
            ReelError::OutOfOrderTiming { .. } => "out_of_order_timing",
            ReelError::AudioShorterThanCaptions { .. } => "audio_shorter_than_captions",
            ReelError::NonPositiveDuration { .. } => "non_positive_duration",
            ReelError::ProbeFailed { .. } => "probe_failed",
            ReelError::ProbeUnparseable { .. } => "probe_unparseable",
            ReelError::RendererFailed { .. } => "renderer_failed",
            ReelError::RendererTimeout { .. } => "renderer_timeout",
            ReelError::MissingOutput(_) => "missing_output",
            ReelError::OutputDirectory { .. } => "output_directory",
            ReelError::Spawn { .. } => "spawn",
            ReelError::ProcessIo { .. } => "process_io",
            ReelError::FilterScript(_) => "filter_script",
            ReelError::ChunkFailed { source, .. } => source.cause(),
        }
    }

    /// Wraps a per-chunk failure with its 1-based part position.
    pub fn in_chunk(self, index: usize, total: usize) -> Self {
        ReelError::ChunkFailed {
            index,
            total,
            source: Box::new(self),
        }
    }

    pub fn from_exit_status(status: Option<i32>, diagnostics: &str) -> Self {
        ReelError::RendererFailed {
            status,
            diagnostics: diagnostics.trim().to_string(),
        }
    }
}

pub type ReelResult<T> = Result<T, ReelError>;
