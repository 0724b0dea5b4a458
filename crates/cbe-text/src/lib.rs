//! Text primitives for the code block line-number engine: glyph width
//! classes, logical line splitting, and highlight range annotations.

pub mod glyph;
pub mod lines;
pub mod range;

pub use glyph::{GlyphClass, classify, classify_char};
pub use lines::{line_count, split_lines};
pub use range::{parse_ranges, try_parse_ranges};
