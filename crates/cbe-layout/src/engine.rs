//! Line-number engine façade.
//!
//! Owns the block registry, the shared metrics cache, one controller per
//! block and the host's observation capabilities. Every entry point is a
//! synchronous callback taking the current `Instant`; timers (settle
//! debounces and the deferred probe) fire from [`LineNumberEngine::on_tick`].
//!
//! Refresh cycles: a block entering the viewport while the cache is stale
//! schedules one deferred probe. Blocks that become visible (or are resized)
//! before it fires join its waiting set, so one cycle measures at most once
//! and every waiting block reuses the fresh cache. A failed probe drops the
//! waiting set; those blocks retry on their next visibility event.
//!
//! Callbacks naming an unknown or destroyed block are counted and ignored.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use cbe_config::{ClickMode, ConfigFile, DisplayConfig, HoverMode, LayoutConfig, OverflowPolicy};
use tracing::{debug, info, trace};

use crate::block::{BlockId, CodeBlockMeta, language_from_classes};
use crate::controller::{BlockController, BlockState};
use crate::counters::EngineCounters;
use crate::marker::{LineMarker, MarkerFlags};
use crate::metrics::MetricsCache;
use crate::registry::BlockRegistry;
use crate::surface::{BlockSurface, MutationWatch, SectionContext, VisibilityNotifier};

/// Settings the engine reads, resolved from configuration once.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub display: DisplayConfig,
    pub layout: LayoutConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&ConfigFile::default())
    }
}

impl From<&ConfigFile> for EngineOptions {
    fn from(file: &ConfigFile) -> Self {
        Self {
            display: file.display.clone(),
            layout: file.layout.clone(),
        }
    }
}

impl EngineOptions {
    fn settle_quiet(&self) -> Duration {
        self.layout.settle_quiet()
    }

    fn probe_delay(&self) -> Duration {
        self.layout.probe_delay()
    }

    fn overflow(&self) -> OverflowPolicy {
        self.layout.overflow
    }

    fn base_flags(&self) -> MarkerFlags {
        match self.display.linenum_hover_mode {
            HoverMode::Highlight => MarkerFlags::HOVER,
            HoverMode::None => MarkerFlags::empty(),
        }
    }
}

/// One block handed over by the host's render callback.
pub struct RenderedBlock {
    /// Class list of the code element (`language-<name>` selects the language).
    pub classes: Vec<String>,
    /// Text content of the code element; `None` when the block has no code element.
    pub content: Option<String>,
    pub surface: Box<dyn BlockSurface>,
    pub section: Box<dyn SectionContext>,
}

/// One intersection entry from the host viewport API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEntry {
    pub id: BlockId,
    pub visible: bool,
}

/// Outcome of clicking a line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAction {
    /// Text of the clicked logical line, for the clipboard.
    Copy(String),
    /// Pinned highlight toggled; `pinned` is the new state.
    Highlight { pinned: bool },
}

#[derive(Debug)]
struct PendingRefresh {
    due: Instant,
    /// Blocks to restyle once the cache is fresh, in arrival order. The first
    /// still-visible one serves as probe host.
    waiting: Vec<BlockId>,
}

impl PendingRefresh {
    fn join(&mut self, id: BlockId) {
        if !self.waiting.contains(&id) {
            self.waiting.push(id);
        }
    }
}

pub struct LineNumberEngine<V: VisibilityNotifier, M: MutationWatch> {
    options: EngineOptions,
    registry: BlockRegistry,
    controllers: AHashMap<BlockId, BlockController>,
    metrics: MetricsCache,
    notifier: V,
    watch: M,
    pending: Option<PendingRefresh>,
    counters: EngineCounters,
}

impl<V: VisibilityNotifier, M: MutationWatch> LineNumberEngine<V, M> {
    pub fn new(options: EngineOptions, notifier: V, watch: M) -> Self {
        let metrics = MetricsCache::new(&options.layout);
        Self::with_metrics_cache(options, metrics, notifier, watch)
    }

    /// Build an engine around an existing cache (a pre-measured fixture in tests).
    pub fn with_metrics_cache(
        options: EngineOptions,
        metrics: MetricsCache,
        notifier: V,
        watch: M,
    ) -> Self {
        Self {
            options,
            registry: BlockRegistry::new(),
            controllers: AHashMap::new(),
            metrics,
            notifier,
            watch,
            pending: None,
            counters: EngineCounters::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Host callbacks
    // ---------------------------------------------------------------------

    /// Post-processor entry. Registers the block and starts its settle wait.
    /// Returns `None` when the block is not numbered.
    pub fn render_block(&mut self, block: RenderedBlock, now: Instant) -> Option<BlockId> {
        if !self.options.display.show_line_number {
            return self.skip("disabled");
        }
        let Some(content) = block.content else {
            return self.skip("missing_content");
        };
        let language = language_from_classes(&block.classes);
        if self.options.display.is_excluded(&language) {
            return self.skip("excluded_language");
        }

        let id = BlockId::mint();
        let meta = CodeBlockMeta::new(id, language, block.section.source_key(), &content);
        let line_count = meta.line_count;
        self.registry.register(meta);
        let mut controller =
            BlockController::new(id, block.surface, block.section, self.options.settle_quiet());
        controller.begin_settle(now);
        self.controllers.insert(id, controller);
        self.watch.arm(id);
        EngineCounters::bump(&self.counters.blocks_registered);
        debug!(target: "layout.engine", %id, lines = line_count, "block_registered");
        Some(id)
    }

    fn skip(&self, reason: &'static str) -> Option<BlockId> {
        EngineCounters::bump(&self.counters.blocks_skipped);
        debug!(target: "layout.engine", reason, "block_skipped");
        None
    }

    /// The DOM under a pending block changed; its quiet period restarts.
    pub fn on_content_mutation(&mut self, id: BlockId, now: Instant) -> bool {
        match self.controllers.get_mut(&id) {
            Some(controller) => controller.note_mutation(now),
            None => {
                self.stale("content_mutation", id);
                false
            }
        }
    }

    /// Fire due timers: settle debounces first, then the deferred probe.
    pub fn on_tick(&mut self, now: Instant) {
        let mut settled: Vec<BlockId> = self
            .controllers
            .iter_mut()
            .filter_map(|(id, c)| c.settle_due(now).then_some(*id))
            .collect();
        settled.sort();
        for id in settled {
            self.build_markers(id);
        }

        if self.pending.as_ref().is_some_and(|p| now >= p.due) {
            self.run_refresh();
        }
    }

    fn build_markers(&mut self, id: BlockId) {
        let Some(line_count) = self.registry.lookup(id).map(|m| m.line_count) else {
            return;
        };
        let base = self.options.base_flags();
        let Some(controller) = self.controllers.get_mut(&id) else {
            return;
        };
        let built = controller.build(line_count, base);
        self.watch.disarm(id);
        EngineCounters::add(&self.counters.markers_built, built as u64);
        // Markers exist before the block can ever be reported visible.
        if controller.start_observing() {
            self.notifier.observe(id);
        }
    }

    /// A batch of viewport intersection entries. Order within the batch is not
    /// significant.
    pub fn on_visibility(&mut self, entries: &[VisibilityEntry], now: Instant) {
        for entry in entries {
            let Some(controller) = self.controllers.get_mut(&entry.id) else {
                self.stale("visibility", entry.id);
                continue;
            };
            if controller.state() != BlockState::Observing {
                trace!(
                    target: "layout.block",
                    id = %entry.id,
                    state = ?controller.state(),
                    "visibility_before_observe"
                );
                continue;
            }
            controller.set_visible(entry.visible);
            if entry.visible {
                self.request_restyle(entry.id, now);
            }
        }
    }

    /// Host resize: invalidate the cache once, re-measure through the first
    /// visible block and restyle every visible block. Markers are not rebuilt.
    /// Returns the number of visible blocks queued.
    pub fn update_line_number(&mut self, now: Instant) -> usize {
        EngineCounters::bump(&self.counters.resize_cycles);
        self.metrics.invalidate();
        let visible = self.visible_ids();
        info!(target: "layout.engine", visible = visible.len(), "resize_cycle");
        if visible.is_empty() {
            return 0;
        }
        let queued = visible.len();
        for id in visible {
            self.request_restyle(id, now);
        }
        queued
    }

    /// Font or zoom changed without a resize. The next refresh re-measures.
    pub fn invalidate_metrics(&mut self) {
        self.metrics.invalidate();
    }

    /// Unmount signal. Returns false when the block was already gone.
    pub fn destroy(&mut self, id: BlockId) -> bool {
        let Some(mut controller) = self.controllers.remove(&id) else {
            self.stale("destroy", id);
            return false;
        };
        controller.destroy();
        self.notifier.unobserve(id);
        self.watch.disarm(id);
        self.registry.unregister(id);
        self.leave_pending(id);
        debug!(target: "layout.engine", %id, "block_destroyed");
        true
    }

    /// Plugin teardown: disconnect all observers and destroy every block.
    /// Returns the number of blocks torn down.
    pub fn clear_observer_cache(&mut self) -> usize {
        self.notifier.disconnect_all();
        let mut ids: Vec<BlockId> = self.controllers.keys().copied().collect();
        ids.sort();
        for id in &ids {
            if let Some(mut controller) = self.controllers.remove(id) {
                controller.destroy();
            }
            self.watch.disarm(*id);
            self.registry.unregister(*id);
        }
        self.pending = None;
        info!(target: "layout.engine", blocks = ids.len(), "observers_cleared");
        ids.len()
    }

    /// Line-number click. `None` when clicking does nothing or the target is gone.
    pub fn on_marker_click(&mut self, id: BlockId, line: u32) -> Option<MarkerAction> {
        if !self.controllers.contains_key(&id) {
            self.stale("marker_click", id);
            return None;
        }
        match self.options.display.linenum_click_mode {
            ClickMode::None => None,
            ClickMode::Copy => self
                .registry
                .lookup(id)?
                .line(line)
                .map(|text| MarkerAction::Copy(text.to_owned())),
            ClickMode::Highlight => {
                let pinned = self.controllers.get_mut(&id)?.toggle_pinned(line)?;
                Some(MarkerAction::Highlight { pinned })
            }
        }
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    pub fn lookup(&self, id: BlockId) -> Option<&CodeBlockMeta> {
        self.registry.lookup(id)
    }

    pub fn markers(&self, id: BlockId) -> Option<&[LineMarker]> {
        self.controllers.get(&id).map(BlockController::markers)
    }

    pub fn state(&self, id: BlockId) -> Option<BlockState> {
        self.controllers.get(&id).map(BlockController::state)
    }

    /// Live block ids in mint order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.controllers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// True when no block is waiting to settle and no probe is pending.
    pub fn is_settled(&self) -> bool {
        self.pending.is_none()
            && self
                .controllers
                .values()
                .all(|c| c.state() >= BlockState::MarkersBuilt)
    }

    /// Earliest instant at which `on_tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.controllers
            .values()
            .filter_map(BlockController::settle_deadline)
            .chain(self.pending.as_ref().map(|p| p.due))
            .min()
    }

    pub fn metrics(&self) -> &MetricsCache {
        &self.metrics
    }

    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn notifier(&self) -> &V {
        &self.notifier
    }

    pub fn watch(&self) -> &M {
        &self.watch
    }

    // ---------------------------------------------------------------------
    // Refresh cycle
    // ---------------------------------------------------------------------

    fn visible_ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self
            .controllers
            .iter()
            .filter(|(_, c)| c.is_visible())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    fn request_restyle(&mut self, id: BlockId, now: Instant) {
        if let Some(pending) = self.pending.as_mut() {
            pending.join(id);
            return;
        }
        if self.metrics.is_valid() {
            self.restyle_block(id);
            return;
        }
        let due = now + self.options.probe_delay();
        debug!(
            target: "layout.metrics",
            probe = %id,
            delay_ms = self.options.layout.probe_delay_ms,
            "probe_scheduled"
        );
        self.pending = Some(PendingRefresh {
            due,
            waiting: vec![id],
        });
        if self.options.probe_delay().is_zero() {
            self.run_refresh();
        }
    }

    fn leave_pending(&mut self, id: BlockId) {
        if let Some(pending) = self.pending.as_mut() {
            pending.waiting.retain(|w| *w != id);
            if pending.waiting.is_empty() {
                self.pending = None;
            }
        }
    }

    fn run_refresh(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let waiting: Vec<BlockId> = pending
            .waiting
            .into_iter()
            .filter(|id| self.controllers.get(id).is_some_and(BlockController::is_visible))
            .collect();
        let Some(&probe) = waiting.first() else {
            trace!(target: "layout.metrics", "probe_dropped_no_visible_block");
            return;
        };

        if !self.metrics.is_valid() {
            let Some(controller) = self.controllers.get_mut(&probe) else {
                return;
            };
            EngineCounters::bump(&self.counters.probe_attempts);
            if let Err(err) = self.metrics.ensure_fresh(controller.surface_mut()) {
                EngineCounters::bump(&self.counters.probe_failures);
                debug!(
                    target: "layout.metrics",
                    %probe,
                    error = %err,
                    dropped = waiting.len(),
                    "probe_failed"
                );
                return;
            }
        }

        for id in waiting {
            self.restyle_block(id);
        }
    }

    /// Recompute one block's heights and highlights. No-op unless the cache
    /// is fresh at this moment.
    fn restyle_block(&mut self, id: BlockId) {
        let Some(metrics) = self.metrics.current().copied() else {
            return;
        };
        let (Some(controller), Some(meta)) =
            (self.controllers.get_mut(&id), self.registry.lookup_mut(id))
        else {
            return;
        };
        if controller.state() != BlockState::Observing {
            return;
        }
        let highlighted: BTreeSet<u32> = controller
            .fence_line()
            .map(|fence| cbe_text::parse_ranges(&fence))
            .unwrap_or_default();
        meta.highlighted_lines = highlighted;
        let meta: &CodeBlockMeta = meta;
        controller.restyle(meta, &metrics, self.options.overflow(), &meta.highlighted_lines);
        EngineCounters::bump(&self.counters.restyled_blocks);
    }

    fn stale(&self, what: &'static str, id: BlockId) {
        EngineCounters::bump(&self.counters.stale_callbacks);
        trace!(target: "layout.block", %id, what, "stale_callback");
    }
}
