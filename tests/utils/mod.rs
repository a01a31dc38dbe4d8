use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Parses stdout as one JSON event per line.
    pub fn events(&self) -> Vec<serde_json::Value> {
        parse_events(&self.stdout)
    }

    /// Error and warning events, which go to stderr.
    pub fn stderr_events_with_code(&self, code: &str) -> Vec<serde_json::Value> {
        parse_events(&self.stderr)
            .into_iter()
            .filter(|event| event["code"] == code)
            .collect()
    }

    pub fn events_with_code(&self, code: &str) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|event| event["code"] == code)
            .collect()
    }
}

fn parse_events(stream: &str) -> Vec<serde_json::Value> {
    stream
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

pub fn run_shortsmith(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_shortsmith"))
        .args(args)
        .current_dir(env.path())
        .env("HOME", env.path())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("NO_COLOR", "1")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

pub const TWO_PART_JOB: &str = r#"{
    "title": "the lighthouse keeper",
    "attribution": "Anonymous",
    "chunks": [
        {
            "audio": "speech/part1.mp3",
            "audio_duration": 4.5,
            "text": "Every night he climbed",
            "words": [
                {"word": "Every", "start": 0.0, "end": 0.4},
                {"word": "night", "start": 0.4, "end": 0.9},
                {"word": "he", "start": 1.0, "end": 1.2},
                {"word": "climbed", "start": 1.2, "end": 4.2}
            ]
        },
        {
            "audio": "speech/part2.mp3",
            "audio_duration": 3.5,
            "words": [
                {"word": "the", "start": 0.0, "end": 0.3},
                {"word": "stairs", "start": 0.3, "end": 3.0}
            ]
        }
    ]
}"#;
