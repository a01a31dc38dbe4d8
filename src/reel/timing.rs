//! Visibility windows for caption units.
//!
//! Word timings arrive from the speech collaborator in narration order. A word
//! stays on screen until the next word starts; the last word stays until its
//! own reported end. Grouped lines span first-word start to last-word end.

use serde::{Deserialize, Serialize};

use super::error::{ReelError, ReelResult};
use super::layout::{LayoutLine, wrap_words};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    #[serde(rename = "start")]
    pub start_seconds: f64,
    #[serde(rename = "end")]
    pub end_seconds: f64,
}

#[cfg(test)]
impl WordTiming {
    pub fn new(word: impl Into<String>, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            word: word.into(),
            start_seconds,
            end_seconds,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// ffmpeg timeline expression enabling a filter inside this window.
    pub fn enable_expression(&self) -> String {
        format!("between(t,{:.6},{:.6})", self.start, self.end)
    }
}

/// How narration is broken into independently timed caption units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    /// One unit per spoken word, shown centered one at a time.
    #[default]
    Words,
    /// Words grouped into wrapped lines.
    Lines,
}

/// Caption texts and their windows, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionTrack {
    pub texts: Vec<String>,
    pub windows: Vec<TimeWindow>,
}

impl CaptionTrack {
    /// End of the last caption window, if any caption exists.
    pub fn last_end(&self) -> Option<f64> {
        self.windows.last().map(|w| w.end)
    }
}

/// Rejects timings that are negative, non-finite, inverted, or out of
/// narration order. Nothing is reordered.
pub fn validate_timings(words: &[WordTiming]) -> ReelResult<()> {
    let mut previous_start: Option<f64> = None;

    for (index, timing) in words.iter().enumerate() {
        let (start, end) = (timing.start_seconds, timing.end_seconds);
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(ReelError::InvalidTiming {
                index,
                word: timing.word.clone(),
                start,
                end,
            });
        }

        if let Some(previous) = previous_start
            && start < previous
        {
            return Err(ReelError::OutOfOrderTiming {
                index,
                start,
                previous,
            });
        }
        previous_start = Some(start);
    }

    Ok(())
}

/// Per-word windows: each word is visible until the next word begins.
pub fn compute_unit_windows(words: &[WordTiming]) -> ReelResult<Vec<TimeWindow>> {
    validate_timings(words)?;

    let windows = words
        .iter()
        .enumerate()
        .map(|(i, timing)| {
            let end = words
                .get(i + 1)
                .map(|next| next.start_seconds)
                .unwrap_or(timing.end_seconds);
            TimeWindow::new(timing.start_seconds, end)
        })
        .collect();

    Ok(windows)
}

/// Windows for words already grouped into lines. The line count of words must
/// match the timing count exactly.
pub fn compute_line_windows(
    lines: &[LayoutLine],
    words: &[WordTiming],
) -> ReelResult<Vec<TimeWindow>> {
    let grouped: usize = lines.iter().map(LayoutLine::word_count).sum();
    if grouped != words.len() {
        return Err(ReelError::UnitCountMismatch {
            text_words: grouped,
            timings: words.len(),
        });
    }
    validate_timings(words)?;

    let mut windows = Vec::with_capacity(lines.len());
    let mut offset = 0;
    for line in lines {
        let count = line.word_count();
        if count == 0 {
            continue;
        }
        let first = &words[offset];
        let last = &words[offset + count - 1];
        windows.push(TimeWindow::new(first.start_seconds, last.end_seconds));
        offset += count;
    }

    Ok(windows)
}

/// Window for the trailing attribution: from the end of the last caption to
/// the end of the audio.
pub fn attribution_window(last_unit_end: f64, total_audio_duration: f64) -> ReelResult<TimeWindow> {
    if total_audio_duration < last_unit_end {
        return Err(ReelError::AudioShorterThanCaptions {
            audio: total_audio_duration,
            last_end: last_unit_end,
        });
    }
    Ok(TimeWindow::new(last_unit_end, total_audio_duration))
}

/// Checks narration text against the timing list when both are supplied.
pub fn check_text_alignment(text: &str, words: &[WordTiming]) -> ReelResult<()> {
    let text_words = text.split_whitespace().count();
    if text_words == 0 {
        return Err(ReelError::EmptyText);
    }
    if text_words != words.len() {
        return Err(ReelError::UnitCountMismatch {
            text_words,
            timings: words.len(),
        });
    }
    Ok(())
}

/// End of the chunk's narration as reported by the speech collaborator.
pub fn final_unit_end(words: &[WordTiming]) -> f64 {
    words.last().map(|w| w.end_seconds).unwrap_or(0.0)
}

/// Builds the timed caption track for one chunk in the requested mode.
pub fn build_caption_track(
    words: &[WordTiming],
    mode: CaptionMode,
    max_line_length: usize,
) -> ReelResult<CaptionTrack> {
    match mode {
        CaptionMode::Words => Ok(CaptionTrack {
            windows: compute_unit_windows(words)?,
            texts: words.iter().map(|w| w.word.clone()).collect(),
        }),
        CaptionMode::Lines => {
            let lines = wrap_words(words.iter().map(|w| w.word.as_str()), max_line_length)?;
            Ok(CaptionTrack {
                windows: compute_line_windows(&lines, words)?,
                texts: lines.iter().map(LayoutLine::text).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::layout::wrap_text;

    fn timings(raw: &[(&str, f64, f64)]) -> Vec<WordTiming> {
        raw.iter()
            .map(|(w, s, e)| WordTiming::new(*w, *s, *e))
            .collect()
    }

    #[test]
    fn word_windows_backfill_from_next_start() {
        let words = timings(&[("one", 0.0, 0.3), ("two", 0.5, 0.8), ("three", 1.0, 1.4)]);
        let windows = compute_unit_windows(&words).unwrap();
        assert_eq!(
            windows,
            vec![
                TimeWindow::new(0.0, 0.5),
                TimeWindow::new(0.5, 1.0),
                TimeWindow::new(1.0, 1.4),
            ]
        );
        for i in 0..windows.len() - 1 {
            assert_eq!(windows[i].end, words[i + 1].start_seconds);
        }
        assert_eq!(windows.last().unwrap().end, words.last().unwrap().end_seconds);
    }

    #[test]
    fn empty_input_yields_no_windows() {
        assert!(compute_unit_windows(&[]).unwrap().is_empty());
        let track = build_caption_track(&[], CaptionMode::Lines, 20).unwrap();
        assert!(track.texts.is_empty());
    }

    #[test]
    fn hello_world_becomes_single_line() {
        let words = timings(&[("Hello", 0.0, 0.5), ("world", 0.5, 1.1)]);
        let track = build_caption_track(&words, CaptionMode::Lines, 20).unwrap();
        assert_eq!(track.texts, vec!["Hello world"]);
        assert_eq!(track.windows, vec![TimeWindow::new(0.0, 1.1)]);
    }

    #[test]
    fn word_mode_keeps_one_unit_per_word() {
        let words = timings(&[("Hello", 0.0, 0.5), ("world", 0.6, 1.1)]);
        let track = build_caption_track(&words, CaptionMode::Words, 20).unwrap();
        assert_eq!(track.texts, vec!["Hello", "world"]);
        assert_eq!(
            track.windows,
            vec![TimeWindow::new(0.0, 0.6), TimeWindow::new(0.6, 1.1)]
        );
        assert_eq!(track.last_end(), Some(1.1));
    }

    #[test]
    fn line_windows_do_not_look_ahead() {
        let words = timings(&[
            ("keep", 0.0, 0.4),
            ("going", 0.4, 0.9),
            ("forward", 1.5, 2.0),
        ]);
        let lines = wrap_text("keep going forward", 10).unwrap();
        let windows = compute_line_windows(&lines, &words).unwrap();
        assert_eq!(
            windows,
            vec![TimeWindow::new(0.0, 0.9), TimeWindow::new(1.5, 2.0)]
        );
    }

    #[test]
    fn out_of_order_starts_are_rejected() {
        let words = timings(&[("late", 2.0, 2.5), ("early", 1.0, 1.5)]);
        let err = compute_unit_windows(&words).unwrap_err();
        assert!(matches!(err, ReelError::OutOfOrderTiming { index: 1, .. }));
        assert_eq!(err.kind(), crate::reel::error::ErrorKind::InputContract);
    }

    #[test]
    fn inverted_or_negative_timings_are_rejected() {
        let inverted = timings(&[("oops", 1.0, 0.5)]);
        assert!(matches!(
            validate_timings(&inverted),
            Err(ReelError::InvalidTiming { index: 0, .. })
        ));
        let negative = timings(&[("oops", -0.1, 0.5)]);
        assert!(validate_timings(&negative).is_err());
        let nan = timings(&[("oops", f64::NAN, 0.5)]);
        assert!(validate_timings(&nan).is_err());
    }

    #[test]
    fn line_count_mismatch_is_reported() {
        let words = timings(&[("only", 0.0, 0.5)]);
        let lines = wrap_text("two words", 20).unwrap();
        assert!(matches!(
            compute_line_windows(&lines, &words),
            Err(ReelError::UnitCountMismatch {
                text_words: 2,
                timings: 1
            })
        ));
    }

    #[test]
    fn attribution_spans_to_audio_end() {
        assert_eq!(
            attribution_window(4.2, 6.0).unwrap(),
            TimeWindow::new(4.2, 6.0)
        );
        assert!(matches!(
            attribution_window(4.2, 3.9),
            Err(ReelError::AudioShorterThanCaptions { .. })
        ));
    }

    #[test]
    fn text_alignment_checks_word_counts() {
        let words = timings(&[("Hello", 0.0, 0.5), ("world", 0.5, 1.1)]);
        assert!(check_text_alignment("Hello  world", &words).is_ok());
        assert!(matches!(
            check_text_alignment("Hello", &words),
            Err(ReelError::UnitCountMismatch { .. })
        ));
        assert!(matches!(
            check_text_alignment("  ", &words),
            Err(ReelError::EmptyText)
        ));
    }

    #[test]
    fn enable_expression_uses_six_decimals() {
        assert_eq!(
            TimeWindow::new(0.5, 1.25).enable_expression(),
            "between(t,0.500000,1.250000)"
        );
    }

    #[test]
    fn word_timings_deserialize_from_collaborator_json() {
        let json = r#"[{"word":"Hi","start":0.1,"end":0.4}]"#;
        let parsed: Vec<WordTiming> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, vec![WordTiming::new("Hi", 0.1, 0.4)]);
    }
}
