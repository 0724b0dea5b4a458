//! Per-block identity and metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cbe_text::lines;

const LANGUAGE_CLASS_PREFIX: &str = "language-";

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier minted when a block is registered.
///
/// Ids are never re-derived from the DOM; collaborators read them from a
/// marker's owner field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    pub(crate) fn mint() -> Self {
        Self(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from its raw value (as carried by host events).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cbe-{}", self.0)
    }
}

/// Cached metadata for one rendered code block.
///
/// Invariants:
/// * `line_count == line_texts.len() - 1` (the final newline of a fenced block
///   yields one trailing empty entry).
/// * `line_texts` never changes after registration; a re-render registers a
///   new block with a new id.
#[derive(Debug, Clone)]
pub struct CodeBlockMeta {
    pub id: BlockId,
    pub language: String,
    pub source_key: String,
    line_texts: Vec<String>,
    pub line_count: usize,
    pub total_char_count: usize,
    /// 1-based line numbers flagged by the fence annotation, as of the last restyle.
    pub highlighted_lines: BTreeSet<u32>,
}

impl CodeBlockMeta {
    pub fn new(
        id: BlockId,
        language: impl Into<String>,
        source_key: impl Into<String>,
        content: &str,
    ) -> Self {
        Self {
            id,
            language: language.into(),
            source_key: source_key.into(),
            line_texts: lines::split_lines(content),
            line_count: lines::line_count(content),
            total_char_count: lines::char_count(content),
            highlighted_lines: BTreeSet::new(),
        }
    }

    /// All split entries, including the trailing one.
    pub fn line_texts(&self) -> &[String] {
        &self.line_texts
    }

    /// Text of a 1-based logical line.
    pub fn line(&self, line: u32) -> Option<&str> {
        let idx = usize::try_from(line).ok()?.checked_sub(1)?;
        if idx >= self.line_count {
            return None;
        }
        self.line_texts.get(idx).map(String::as_str)
    }
}

/// Language name from the code element's class list (`language-<name>`).
/// Blocks without a language class get the empty name.
pub fn language_from_classes<I, S>(classes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    classes
        .into_iter()
        .find_map(|class| {
            class
                .as_ref()
                .strip_prefix(LANGUAGE_CLASS_PREFIX)
                .map(str::to_owned)
        })
        .unwrap_or_default()
}
