//! Per-block render controller.
//!
//! One controller per rendered block, holding the block's surface handles,
//! its markers and its lifecycle state:
//!
//! ```text
//! Registered -> MarkersPending -> MarkersBuilt -> Observing -> Destroyed
//!      \______________\_______________\______________\___________^
//! ```
//!
//! Any state may jump to `Destroyed`. Transitions only move forward; the
//! engine drives them and the controller refuses out-of-order requests.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use cbe_config::OverflowPolicy;
use tracing::{debug, trace};

use crate::block::{BlockId, CodeBlockMeta};
use crate::debounce::Debounce;
use crate::estimate::estimate_height;
use crate::marker::{LineMarker, MarkerFlags, build_markers};
use crate::metrics::BaseLineMetrics;
use crate::surface::{BlockSurface, SectionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockState {
    /// Content split and id minted; nothing mounted yet.
    Registered,
    /// Waiting for the block's DOM to stop mutating.
    MarkersPending,
    /// Markers mounted, visibility not yet observed.
    MarkersBuilt,
    /// Visibility observer attached; restyled whenever visible.
    Observing,
    Destroyed,
}

pub(crate) struct BlockController {
    pub(crate) id: BlockId,
    state: BlockState,
    settle: Debounce,
    markers: Vec<LineMarker>,
    visible: bool,
    surface: Box<dyn BlockSurface>,
    section: Box<dyn SectionContext>,
}

impl BlockController {
    pub(crate) fn new(
        id: BlockId,
        surface: Box<dyn BlockSurface>,
        section: Box<dyn SectionContext>,
        settle_quiet: Duration,
    ) -> Self {
        Self {
            id,
            state: BlockState::Registered,
            settle: Debounce::new(settle_quiet),
            markers: Vec::new(),
            visible: false,
            surface,
            section,
        }
    }

    pub(crate) fn state(&self) -> BlockState {
        self.state
    }

    pub(crate) fn markers(&self) -> &[LineMarker] {
        &self.markers
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn surface_mut(&mut self) -> &mut dyn BlockSurface {
        self.surface.as_mut()
    }

    pub(crate) fn settle_deadline(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    fn transition(&mut self, to: BlockState) -> bool {
        if to <= self.state && to != BlockState::Destroyed {
            trace!(
                target: "layout.block",
                id = %self.id,
                from = ?self.state,
                to = ?to,
                "transition_refused"
            );
            return false;
        }
        debug!(target: "layout.block", id = %self.id, from = ?self.state, to = ?to, "block_state");
        self.state = to;
        true
    }

    /// Registered -> MarkersPending. The quiet period starts now.
    pub(crate) fn begin_settle(&mut self, now: Instant) -> bool {
        if self.state != BlockState::Registered || !self.transition(BlockState::MarkersPending) {
            return false;
        }
        self.settle.arm(now);
        true
    }

    /// A content mutation while pending restarts the quiet period.
    pub(crate) fn note_mutation(&mut self, now: Instant) -> bool {
        self.state == BlockState::MarkersPending && self.settle.touch(now)
    }

    /// True once, when the quiet period has elapsed.
    pub(crate) fn settle_due(&mut self, now: Instant) -> bool {
        self.state == BlockState::MarkersPending && self.settle.fire_if_due(now)
    }

    /// MarkersPending -> MarkersBuilt: mount one marker per logical line.
    pub(crate) fn build(&mut self, line_count: usize, base: MarkerFlags) -> usize {
        if self.state != BlockState::MarkersPending || !self.transition(BlockState::MarkersBuilt) {
            return 0;
        }
        self.markers = build_markers(self.id, line_count, base);
        self.surface.mount_markers(&self.markers);
        debug!(
            target: "layout.block",
            id = %self.id,
            markers = self.markers.len(),
            "markers_built"
        );
        self.markers.len()
    }

    /// MarkersBuilt -> Observing.
    pub(crate) fn start_observing(&mut self) -> bool {
        self.state == BlockState::MarkersBuilt && self.transition(BlockState::Observing)
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        if self.state == BlockState::Observing {
            self.visible = visible;
        }
    }

    /// Live fence annotation from the host section, if still resolvable.
    pub(crate) fn fence_line(&self) -> Option<String> {
        self.section.fence_line()
    }

    /// Recompute every marker's height and highlight flag, push them to the
    /// surface and tag the root. Returns the number of markers styled.
    pub(crate) fn restyle(
        &mut self,
        meta: &CodeBlockMeta,
        metrics: &BaseLineMetrics,
        policy: OverflowPolicy,
        highlighted: &BTreeSet<u32>,
    ) -> usize {
        if self.state != BlockState::Observing {
            return 0;
        }
        for marker in &mut self.markers {
            let text = meta.line(marker.line).unwrap_or_default();
            marker.height_px = Some(estimate_height(text, metrics, policy));
            marker
                .flags
                .set(MarkerFlags::HIGHLIGHT, highlighted.contains(&marker.line));
            self.surface.style_marker(marker);
        }
        self.surface.set_line_numbers_class(true);
        trace!(
            target: "layout.block",
            id = %self.id,
            markers = self.markers.len(),
            "markers_restyled"
        );
        self.markers.len()
    }

    /// Toggle the pinned flag on a 1-based line. Returns the new state.
    pub(crate) fn toggle_pinned(&mut self, line: u32) -> Option<bool> {
        if self.state != BlockState::Observing && self.state != BlockState::MarkersBuilt {
            return None;
        }
        let marker = self.markers.iter_mut().find(|m| m.line == line)?;
        marker.flags.toggle(MarkerFlags::PINNED);
        let pinned = marker.is_pinned();
        self.surface.style_marker(marker);
        Some(pinned)
    }

    /// Any state -> Destroyed. Idempotent.
    pub(crate) fn destroy(&mut self) -> bool {
        if self.state == BlockState::Destroyed {
            return false;
        }
        self.settle.cancel();
        self.visible = false;
        self.transition(BlockState::Destroyed)
    }
}
