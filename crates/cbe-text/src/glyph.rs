//! Glyph width classification for wrap estimation.
//!
//! Every character handed to the wrap estimator is sorted into one of two
//! width classes. `Narrow` glyphs render at roughly the width of a Latin
//! letter in the code font; `Wide` glyphs render at roughly the width of a
//! CJK ideograph. The two pixel widths themselves are measured at runtime
//! (see the metrics cache in `cbe-layout`); this module only decides which of
//! the two applies.
//!
//! Narrow ranges:
//! - U+0020..=U+007E  ASCII letters, digits and punctuation
//! - U+00C0..=U+00FF  Latin-1 letters
//! - U+0100..=U+017F  Latin Extended-A
//! - U+0180..=U+024F  Latin Extended-B
//! - U+0400..=U+044F  Cyrillic base letters
//!
//! Everything else is `Wide`, including control characters. Tab is never
//! classified by callers: the estimator gives it `tab_width` narrow cells.
//!
//! Invariants:
//! - `classify` is total: every `u32` maps to exactly one class.
//! - Classification never inspects neighbouring characters (no shaping,
//!   no combining-mark handling). A misclassified rare script costs at most a
//!   one-row error in the estimate.

/// Width class of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphClass {
    Narrow,
    Wide,
}

const NARROW_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007E),
    (0x00C0, 0x00FF),
    (0x0100, 0x017F),
    (0x0180, 0x024F),
    (0x0400, 0x044F),
];

/// Classify a raw code point (or UTF-16 code unit).
#[inline]
pub fn classify(code: u32) -> GlyphClass {
    if NARROW_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&code))
    {
        GlyphClass::Narrow
    } else {
        GlyphClass::Wide
    }
}

/// Convenience wrapper over [`classify`] for a `char`.
#[inline]
pub fn classify_char(c: char) -> GlyphClass {
    classify(c as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_letters_and_digits_are_narrow() {
        for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
            assert_eq!(classify_char(c), GlyphClass::Narrow, "{c:?}");
        }
    }

    #[test]
    fn ascii_punctuation_and_space() {
        assert_eq!(classify_char(' '), GlyphClass::Narrow);
        assert_eq!(classify_char('{'), GlyphClass::Narrow);
        assert_eq!(classify_char('~'), GlyphClass::Narrow);
    }

    #[test]
    fn latin_extended() {
        assert_eq!(classify_char('é'), GlyphClass::Narrow);
        assert_eq!(classify_char('Ł'), GlyphClass::Narrow);
        assert_eq!(classify_char('ƒ'), GlyphClass::Narrow);
    }

    #[test]
    fn cyrillic_base_letters() {
        assert_eq!(classify_char('Ж'), GlyphClass::Narrow);
        assert_eq!(classify_char('я'), GlyphClass::Narrow);
        // U+0450 (ѐ) sits just past the enumerated block.
        assert_eq!(classify(0x0450), GlyphClass::Wide);
    }

    #[test]
    fn cjk_is_wide() {
        assert_eq!(classify(0x4E2D), GlyphClass::Wide);
        assert_eq!(classify_char('好'), GlyphClass::Wide);
        assert_eq!(classify_char('界'), GlyphClass::Wide);
    }

    #[test]
    fn gaps_between_ranges_are_wide() {
        // Latin-1 punctuation block (U+00A0..U+00BF) is not enumerated.
        assert_eq!(classify(0x00A9), GlyphClass::Wide);
        assert_eq!(classify(0x007F), GlyphClass::Wide);
        assert_eq!(classify(0x0009), GlyphClass::Wide);
    }
}
