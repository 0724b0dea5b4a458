//! Wrapped-row estimation for one logical line.
//!
//! Measuring each rendered line's box would force a synchronous reflow per
//! line. Instead the row count is predicted from two glyph widths:
//!
//! 1. `min_columns = floor(content_width / wide_width)` is the number of
//!    characters guaranteed to fit on one row whatever their class. Lines no
//!    longer than that take one row without inspecting any character.
//! 2. Longer lines are walked once, accumulating each character's width (tab =
//!    `narrow * tab_width`). When the accumulator overflows the content width
//!    a new row starts holding the overflowing character; characters are
//!    never split.
//!
//! Lengths count Unicode scalar values. Ligatures, combining marks, kerning
//! and bidi are ignored; the result is advisory.

use cbe_config::OverflowPolicy;
use cbe_text::{GlyphClass, classify_char};

use crate::metrics::BaseLineMetrics;

/// Characters guaranteed to fit on one display row.
#[inline]
pub fn min_columns_per_row(metrics: &BaseLineMetrics) -> usize {
    if metrics.wide_glyph_width <= 0.0 || metrics.content_width_px <= 0.0 {
        return 0;
    }
    (metrics.content_width_px / metrics.wide_glyph_width).floor() as usize
}

#[inline]
fn char_width(c: char, metrics: &BaseLineMetrics) -> f64 {
    if c == '\t' {
        return metrics.narrow_glyph_width * f64::from(metrics.tab_width_columns);
    }
    match classify_char(c) {
        GlyphClass::Narrow => metrics.narrow_glyph_width,
        GlyphClass::Wide => metrics.wide_glyph_width,
    }
}

/// Number of display rows `line` occupies. Always at least one.
pub fn estimate_rows(line: &str, metrics: &BaseLineMetrics, policy: OverflowPolicy) -> u32 {
    let min_columns = min_columns_per_row(metrics);
    // Byte length bounds char count from above; skip counting when it already fits.
    if line.len() <= min_columns || line.chars().count() <= min_columns {
        return 1;
    }
    let available = metrics.content_width_px;
    let mut rows = 1u32;
    let mut current = 0.0f64;
    for c in line.chars() {
        let w = char_width(c, metrics);
        current += w;
        if policy.overflows(current, available) {
            rows += 1;
            current = w;
        }
    }
    rows
}

/// Pixel height for a line's marker.
pub fn estimate_height(line: &str, metrics: &BaseLineMetrics, policy: OverflowPolicy) -> f64 {
    f64::from(estimate_rows(line, metrics, policy)) * metrics.line_height_px
}
