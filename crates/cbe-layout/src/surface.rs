//! Host capabilities the engine is written against.
//!
//! Nothing in this crate touches a real DOM. The host binds each trait to its
//! platform (element measurement, intersection observers, mutation
//! observers); tests and the headless harness bind them to fakes. All calls
//! happen on the host's single UI thread, so none of the traits require
//! `Send`.

use crate::block::BlockId;
use crate::marker::LineMarker;

/// How the probe element is laid out while measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDisplay {
    /// Shrink-wrapped to its text; used for glyph widths.
    Inline,
    /// Full-width block; used for the single-line height.
    Block,
}

/// Border box of the probe after layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeRect {
    pub width: f64,
    pub height: f64,
}

/// Measurement access to a block's content area.
///
/// The metrics cache calls `insert_probe`, then any number of `measure_probe`
/// calls, then always `remove_probe`, all within one turn.
pub trait ProbeHost {
    fn insert_probe(&mut self);
    fn measure_probe(&mut self, text: &str, display: ProbeDisplay) -> ProbeRect;
    fn remove_probe(&mut self);
    /// Width available for text inside the content element.
    fn content_width(&self) -> f64;
    /// Effective tab size in columns, if the host exposes one.
    fn tab_size(&self) -> Option<u32>;
}

/// A rendered block's DOM handles: root, content element and marker container.
pub trait BlockSurface: ProbeHost {
    /// Append marker rows to the marker container, in order.
    fn mount_markers(&mut self, markers: &[LineMarker]);
    /// Apply a marker's current height and state classes to its row.
    fn style_marker(&mut self, marker: &LineMarker);
    /// Toggle the "has line numbers" class on the block root.
    fn set_line_numbers_class(&mut self, on: bool);
}

/// The host's section context for a rendered block.
pub trait SectionContext {
    /// Stable source-location key (e.g. file path plus section start line).
    fn source_key(&self) -> String;
    /// Current text of the block's opening fence line, re-read live from the
    /// editor. `None` when the section is no longer resolvable.
    fn fence_line(&self) -> Option<String>;
}

/// Viewport intersection capability. Entries come back through
/// `LineNumberEngine::on_visibility`.
pub trait VisibilityNotifier {
    fn observe(&mut self, id: BlockId);
    fn unobserve(&mut self, id: BlockId);
    fn disconnect_all(&mut self);
}

/// Content mutation capability. Mutations come back through
/// `LineNumberEngine::on_content_mutation`.
pub trait MutationWatch {
    fn arm(&mut self, id: BlockId);
    fn disarm(&mut self, id: BlockId);
}
