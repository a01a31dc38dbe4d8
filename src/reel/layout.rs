//! Word-boundary line wrapping for captions and titles.
//!
//! Lengths are counted in characters, not bytes, so accented narration wraps
//! at the same width as plain ASCII.

use super::error::{ReelError, ReelResult};

/// Marker appended to the last kept title line when the title is cut short.
pub const TITLE_ELLIPSIS: &str = "...";

/// Lines a title may occupy before it is truncated.
pub const TITLE_MAX_LINES: usize = 4;

const ATTRIBUTION_ABBREVIATE_AFTER: usize = 20;
const FALLBACK_PREFIX: &str = "reel";

/// One display line made of whole words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub words: Vec<String>,
}

impl LayoutLine {
    fn with_word(word: &str) -> Self {
        Self {
            words: vec![word.to_string()],
        }
    }

    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Character length including single-space separators.
    pub fn char_len(&self) -> usize {
        let letters: usize = self.words.iter().map(|w| w.chars().count()).sum();
        letters + self.words.len().saturating_sub(1)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Greedily packs whitespace-separated words into lines of at most
/// `max_line_length` characters. Words are never split; an over-long word
/// occupies a line by itself.
pub fn wrap_text(text: &str, max_line_length: usize) -> ReelResult<Vec<LayoutLine>> {
    wrap_words(text.split_whitespace(), max_line_length)
}

pub(crate) fn wrap_words<'a, I>(words: I, max_line_length: usize) -> ReelResult<Vec<LayoutLine>>
where
    I: IntoIterator<Item = &'a str>,
{
    if max_line_length == 0 {
        return Err(ReelError::ZeroLineLength);
    }

    let mut lines = Vec::new();
    let mut current: Option<LayoutLine> = None;

    for word in words {
        let word_len = word.chars().count();
        current = match current.take() {
            None => Some(LayoutLine::with_word(word)),
            Some(mut line) => {
                if line.char_len() + word_len + 1 <= max_line_length {
                    line.words.push(word.to_string());
                    Some(line)
                } else {
                    lines.push(line);
                    Some(LayoutLine::with_word(word))
                }
            }
        };
    }

    if let Some(line) = current {
        lines.push(line);
    }

    Ok(lines)
}

/// Wraps a title and caps it at [`TITLE_MAX_LINES`] lines, marking the cut
/// with an ellipsis on the last kept line.
pub fn wrap_title(title: &str, max_line_length: usize) -> ReelResult<Vec<String>> {
    let lines = wrap_text(title, max_line_length)?;
    let truncated = lines.len() > TITLE_MAX_LINES;

    let mut rendered: Vec<String> = lines
        .into_iter()
        .take(TITLE_MAX_LINES)
        .map(|line| line.text())
        .collect();

    if truncated && let Some(last) = rendered.last_mut() {
        last.push_str(TITLE_ELLIPSIS);
    }

    Ok(rendered)
}

/// Shortens long multi-word names to "First Last".
pub fn abbreviate_attribution(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.chars().count() <= ATTRIBUTION_ABBREVIATE_AFTER {
        return trimmed.to_string();
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    match (words.first(), words.last()) {
        (Some(first), Some(last)) if words.len() > 1 => format!("{first} {last}"),
        _ => trimmed.to_string(),
    }
}

pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// File-name prefix derived from a title: truncated to `max_chars`
/// characters, whitespace removed.
pub fn output_prefix(title: &str, max_chars: usize) -> String {
    let prefix: String = title
        .chars()
        .take(max_chars)
        .filter(|c| !c.is_whitespace())
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();

    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}
