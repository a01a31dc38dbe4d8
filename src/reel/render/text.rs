use std::fmt;

use serde::Serialize;

/// Caption or title text escaped for an ffmpeg `drawtext=text='...'` value.
///
/// The escaped form is the only one a render plan stores, so text cannot
/// reach the filter graph unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DrawText(String);

impl DrawText {
    pub fn new(raw: &str) -> Self {
        Self(escape_drawtext(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escapes text for a single-quoted drawtext value. Backslashes go first so
/// later escapes are not doubled; line breaks become spaces. `%` is left
/// alone: the filters run with `expansion=none`.
pub fn escape_drawtext(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("'\\''"),
            '\r' => {}
            '\n' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}
