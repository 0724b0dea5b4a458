//! Line-number layout engine for rendered code blocks.
//!
//! Each rendered block gets one marker per logical line, sized to the number
//! of display rows the line wraps into. Row counts are estimated from two
//! cached glyph widths instead of measuring every line, so a refresh costs one
//! probe measurement per cycle regardless of block count.
//!
//! The host binds the traits in [`surface`] to its DOM and drives
//! [`LineNumberEngine`] from its render, mutation, viewport and resize
//! callbacks.

pub mod block;
pub mod controller;
pub mod counters;
pub mod debounce;
pub mod engine;
pub mod estimate;
pub mod marker;
pub mod metrics;
pub mod registry;
pub mod surface;

pub use block::{BlockId, CodeBlockMeta, language_from_classes};
pub use controller::BlockState;
pub use counters::{EngineCounters, EngineCountersSnapshot};
pub use engine::{EngineOptions, LineNumberEngine, MarkerAction, RenderedBlock, VisibilityEntry};
pub use estimate::{estimate_height, estimate_rows, min_columns_per_row};
pub use marker::{LineMarker, MarkerFlags};
pub use metrics::{BaseLineMetrics, MeasureError, MetricsCache};
pub use registry::BlockRegistry;
pub use surface::{
    BlockSurface, MutationWatch, ProbeDisplay, ProbeHost, ProbeRect, SectionContext,
    VisibilityNotifier,
};
