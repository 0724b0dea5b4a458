//! Line markers: one lightweight row element per logical line.
//!
//! Markers are plain values owned by their block's controller. The host
//! surface mirrors them into DOM rows (`cbe-line`) inside the marker
//! container (`cbe-linenum-wrap`); every restyle pushes the full marker value
//! so the surface never has to diff.

use crate::block::BlockId;

/// CSS classes the host surface applies for marker state.
pub mod class {
    /// Set on the block root once markers are sized.
    pub const HAS_LINE_NUMBER: &str = "cbe-has-linenumber";
    pub const MARKER_CONTAINER: &str = "cbe-linenum-wrap";
    pub const LINE: &str = "cbe-line";
    pub const LINE_NUMBER: &str = "cbe-linenum";
    pub const HIGHLIGHT: &str = "cbe-line-highlight";
    pub const PINNED: &str = "cbe-line-highlight-pinned";
    pub const HOVER: &str = "cbe-line-hover";
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MarkerFlags: u8 {
        /// Listed in the fence annotation's highlight ranges.
        const HIGHLIGHT = 0b0000_0001;
        /// Toggled on by clicking the line number.
        const PINNED    = 0b0000_0010;
        /// Highlights while hovered.
        const HOVER     = 0b0000_0100;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineMarker {
    /// Owning block.
    pub block: BlockId,
    /// 1-based logical line index.
    pub line: u32,
    /// Assigned pixel height; `None` until metrics were available.
    pub height_px: Option<f64>,
    pub flags: MarkerFlags,
}

impl LineMarker {
    pub fn new(block: BlockId, line: u32, flags: MarkerFlags) -> Self {
        Self {
            block,
            line,
            height_px: None,
            flags,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.flags.contains(MarkerFlags::HIGHLIGHT)
    }

    pub fn is_pinned(&self) -> bool {
        self.flags.contains(MarkerFlags::PINNED)
    }

    /// Classes the surface should carry for this marker's row.
    pub fn classes(&self) -> Vec<&'static str> {
        let mut out = vec![class::LINE];
        if self.flags.contains(MarkerFlags::HOVER) {
            out.push(class::HOVER);
        }
        if self.flags.contains(MarkerFlags::HIGHLIGHT) {
            out.push(class::HIGHLIGHT);
        }
        if self.flags.contains(MarkerFlags::PINNED) {
            out.push(class::PINNED);
        }
        out
    }
}

/// Build `count` markers tagged `1..=count` for `block`.
pub fn build_markers(block: BlockId, count: usize, base: MarkerFlags) -> Vec<LineMarker> {
    (1..=count)
        .map(|line| LineMarker::new(block, line as u32, base))
        .collect()
}
