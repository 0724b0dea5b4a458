//! Highlight range annotations.
//!
//! A fence line such as ```` ```rust {1,3,7-9} ```` asks for lines 1, 3, 7, 8
//! and 9 to be highlighted. Only the first `{...}` group on the line is
//! considered. Inside the group parts are separated by `,` and each part is a
//! single 1-based line number or an inclusive `start-end` span.
//!
//! Parsing is lenient at the edges and strict inside the group:
//! * no group, or an empty group, yields an empty set;
//! * whitespace around parts and empty parts are ignored;
//! * `start > end` expands to nothing (not an error);
//! * a span wider than [`MAX_RANGE_SPAN`] lines is skipped, other parts stay;
//! * any other malformed part makes the whole annotation yield no highlights.
//!
//! Numbers are not checked against the block's line count; consumers drop
//! out-of-range entries when applying highlights.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Largest number of lines a single `start-end` part may expand to. Wider
/// spans are dropped on their own.
pub const MAX_RANGE_SPAN: u32 = 100_000;

static GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("static highlight group pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid line number `{0}`")]
    InvalidNumber(String),
}

/// Parse the first `{...}` group of `annotation`, reporting malformed parts.
pub fn try_parse_ranges(annotation: &str) -> Result<BTreeSet<u32>, RangeError> {
    let mut lines = BTreeSet::new();
    let Some(group) = GROUP.captures(annotation).and_then(|c| c.get(1)) else {
        return Ok(lines);
    };
    for part in group.as_str().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                if start > end {
                    continue;
                }
                if end - start >= MAX_RANGE_SPAN {
                    tracing::debug!(target: "layout.block", start, end, "highlight_span_skipped");
                    continue;
                }
                lines.extend(start..=end);
            }
            None => {
                lines.insert(parse_number(part)?);
            }
        }
    }
    Ok(lines)
}

/// Parse highlight ranges, treating a malformed annotation as "no highlights".
pub fn parse_ranges(annotation: &str) -> BTreeSet<u32> {
    try_parse_ranges(annotation).unwrap_or_else(|err| {
        tracing::debug!(target: "layout.block", %err, "highlight_annotation_ignored");
        BTreeSet::new()
    })
}

fn parse_number(raw: &str) -> Result<u32, RangeError> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .map_err(|_| RangeError::InvalidNumber(raw.to_owned()))
}
