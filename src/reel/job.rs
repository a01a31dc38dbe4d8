use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::timing::WordTiming;

/// One narrated chunk as handed over by the speech collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechChunk {
    pub audio: PathBuf,
    pub words: Vec<WordTiming>,
    /// Narration text, compared word-for-word against `words` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Known audio length; skips probing when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelJob {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub chunks: Vec<SpeechChunk>,
}

impl ReelJob {
    /// Reads a job document. Relative audio paths are taken relative to the
    /// document's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading job file {}", path.display()))?;
        let mut job: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing job file {}", path.display()))?;

        if job.chunks.is_empty() {
            bail!("Job file {} contains no chunks", path.display());
        }

        if let Some(base) = path.parent() {
            job.resolve_audio_paths(base);
        }
        Ok(job)
    }

    pub fn resolve_audio_paths(&mut self, base: &Path) {
        for chunk in &mut self.chunks {
            if chunk.audio.is_relative() {
                chunk.audio = base.join(&chunk.audio);
            }
        }
    }
}
