//! Marker report: one tab-separated row per marker.

use std::fmt::Write;

use cbe_layout::{CodeBlockMeta, LineMarker, MarkerFlags};

pub const HEADER: &str = "block\tlanguage\tline\theight_px\tflags";

fn flag_names(flags: MarkerFlags) -> String {
    let names: Vec<&str> = flags.iter_names().map(|(name, _)| name).collect();
    if names.is_empty() {
        "-".to_owned()
    } else {
        names.join(",").to_lowercase()
    }
}

pub fn write_block(out: &mut String, meta: &CodeBlockMeta, markers: &[LineMarker]) {
    let language = if meta.language.is_empty() {
        "-"
    } else {
        meta.language.as_str()
    };
    for marker in markers {
        let height = marker
            .height_px
            .map_or_else(|| "-".to_owned(), |h| format!("{h:.1}"));
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            meta.id,
            language,
            marker.line,
            height,
            flag_names(marker.flags)
        );
    }
}
