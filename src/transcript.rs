//! Conversion of WebVTT caption documents into flat readable text.

use regex::Regex;
use std::sync::LazyLock;

/// Matches lines that start with a cue timestamp, e.g. "00:12" or "01:02:03.500"
static TIMESTAMP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d{2}:\d{2}").expect("timestamp pattern is a valid regex")
});

/// Convert a raw WebVTT document into flat human-readable text
///
/// Drops the `WEBVTT` header, cue timing lines, and blank lines, then
/// joins the remaining cue text into a single line with collapsed
/// whitespace.
///
/// # Examples
///
/// ```
/// use lecture_dl::transcript::vtt_to_text;
///
/// let raw = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nWelcome to\nthe course.\n";
/// assert_eq!(vtt_to_text(raw), "Welcome to the course.");
/// ```
pub fn vtt_to_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = String::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed == "WEBVTT"
            || trimmed.contains("-->")
            || TIMESTAMP_LINE.is_match(trimmed)
        {
            continue;
        }
        text.push_str(trimmed);
        text.push(' ');
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
