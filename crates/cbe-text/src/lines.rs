//! Logical line splitting for rendered code block content.
//!
//! The host hands over the code element's text content, which for a
//! fence-delimited block always ends with a newline. Splitting on `\n`
//! therefore yields one trailing empty entry that is not a line of its own.
//!
//! Invariants:
//! * `line_count(t) == number of '\n' in t`.
//! * `split_lines(t).len() == line_count(t) + 1`.

/// Logical line separator used by the host's code renderer.
pub const LINE_SPLIT: char = '\n';

/// Split block content into logical line texts, keeping the trailing entry
/// produced by the final newline.
pub fn split_lines(content: &str) -> Vec<String> {
    content.split(LINE_SPLIT).map(str::to_owned).collect()
}

/// Number of logical lines in block content (one per newline).
pub fn line_count(content: &str) -> usize {
    content.matches(LINE_SPLIT).count()
}

/// Character count used for block statistics.
pub fn char_count(content: &str) -> usize {
    content.chars().count()
}
