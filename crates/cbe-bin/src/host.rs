//! Headless host: binds the engine's host capabilities to an in-memory pane.
//!
//! Glyph boxes come from fixed widths per glyph class, so a run is fully
//! determined by its arguments. Every observed block counts as on screen.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

use cbe_config::ConfigFile;
use cbe_layout::{
    BlockId, BlockSurface, EngineOptions, LineMarker, LineNumberEngine, MutationWatch,
    ProbeDisplay, ProbeHost, ProbeRect, RenderedBlock, SectionContext, VisibilityEntry,
    VisibilityNotifier,
};
use cbe_text::{GlyphClass, classify_char};
use tracing::{debug, info};

use crate::fences::FencedBlock;

/// Pane geometry and font metrics shared by every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pane {
    pub content_width: f64,
    pub narrow: f64,
    pub wide: f64,
    pub line_height: f64,
}

impl Pane {
    fn glyph_width(&self, c: char) -> f64 {
        match classify_char(c) {
            GlyphClass::Narrow => self.narrow,
            GlyphClass::Wide => self.wide,
        }
    }
}

struct HeadlessSurface {
    pane: Rc<RefCell<Pane>>,
    probe_mounted: bool,
}

impl ProbeHost for HeadlessSurface {
    fn insert_probe(&mut self) {
        self.probe_mounted = true;
    }

    fn measure_probe(&mut self, text: &str, display: ProbeDisplay) -> ProbeRect {
        let pane = self.pane.borrow();
        if !self.probe_mounted {
            return ProbeRect::default();
        }
        let width = match display {
            ProbeDisplay::Inline => text.chars().map(|c| pane.glyph_width(c)).sum(),
            ProbeDisplay::Block => pane.content_width,
        };
        ProbeRect {
            width,
            height: pane.line_height,
        }
    }

    fn remove_probe(&mut self) {
        self.probe_mounted = false;
    }

    fn content_width(&self) -> f64 {
        self.pane.borrow().content_width
    }

    fn tab_size(&self) -> Option<u32> {
        None
    }
}

impl BlockSurface for HeadlessSurface {
    fn mount_markers(&mut self, _markers: &[LineMarker]) {}

    fn style_marker(&mut self, _marker: &LineMarker) {}

    fn set_line_numbers_class(&mut self, _on: bool) {}
}

struct HeadlessSection {
    key: String,
    fence: Option<String>,
}

impl SectionContext for HeadlessSection {
    fn source_key(&self) -> String {
        self.key.clone()
    }

    fn fence_line(&self) -> Option<String> {
        self.fence.clone()
    }
}

/// Queues newly observed blocks; the session reports them visible.
#[derive(Clone, Default)]
pub struct HeadlessNotifier {
    entering: Rc<RefCell<Vec<BlockId>>>,
    observed: Rc<RefCell<BTreeSet<BlockId>>>,
}

impl VisibilityNotifier for HeadlessNotifier {
    fn observe(&mut self, id: BlockId) {
        if self.observed.borrow_mut().insert(id) {
            self.entering.borrow_mut().push(id);
        }
    }

    fn unobserve(&mut self, id: BlockId) {
        self.observed.borrow_mut().remove(&id);
        self.entering.borrow_mut().retain(|e| *e != id);
    }

    fn disconnect_all(&mut self) {
        self.observed.borrow_mut().clear();
        self.entering.borrow_mut().clear();
    }
}

/// Static document: nothing mutates after render.
#[derive(Default)]
pub struct HeadlessWatch {
    armed: BTreeSet<BlockId>,
}

impl MutationWatch for HeadlessWatch {
    fn arm(&mut self, id: BlockId) {
        self.armed.insert(id);
    }

    fn disarm(&mut self, id: BlockId) {
        self.armed.remove(&id);
    }
}

pub type HeadlessEngine = LineNumberEngine<HeadlessNotifier, HeadlessWatch>;

/// One document rendered into the headless pane.
pub struct Session {
    pub engine: HeadlessEngine,
    pane: Rc<RefCell<Pane>>,
    entering: Rc<RefCell<Vec<BlockId>>>,
}

impl Session {
    pub fn new(config: &ConfigFile, pane: Pane) -> Self {
        let notifier = HeadlessNotifier::default();
        let entering = notifier.entering.clone();
        Self {
            engine: LineNumberEngine::new(
                EngineOptions::from(config),
                notifier,
                HeadlessWatch::default(),
            ),
            pane: Rc::new(RefCell::new(pane)),
            entering,
        }
    }

    /// Hand every discovered block to the engine. Returns the registered count.
    pub fn render(&mut self, source: &str, blocks: Vec<FencedBlock>, now: Instant) -> usize {
        let mut registered = 0;
        for block in blocks {
            let rendered = RenderedBlock {
                classes: block.classes(),
                content: Some(block.content),
                surface: Box::new(HeadlessSurface {
                    pane: self.pane.clone(),
                    probe_mounted: false,
                }),
                section: Box::new(HeadlessSection {
                    key: format!("{source}:{}", block.source_line),
                    fence: block.fence_line,
                }),
            };
            if self.engine.render_block(rendered, now).is_some() {
                registered += 1;
            }
        }
        info!(target: "host.session", registered, "document_rendered");
        registered
    }

    /// Fire due timers, then report newly observed blocks as visible.
    pub fn tick(&mut self, now: Instant) {
        self.engine.on_tick(now);
        let entering: Vec<VisibilityEntry> = self
            .entering
            .borrow_mut()
            .drain(..)
            .map(|id| VisibilityEntry { id, visible: true })
            .collect();
        if !entering.is_empty() {
            debug!(target: "host.session", blocks = entering.len(), "blocks_entered_viewport");
            self.engine.on_visibility(&entering, now);
        }
    }

    pub fn resize(&mut self, width_px: f64, now: Instant) -> usize {
        self.pane.borrow_mut().content_width = width_px;
        self.engine.update_line_number(now)
    }

    /// All blocks have sized markers and nothing is scheduled.
    pub fn is_done(&self) -> bool {
        self.entering.borrow().is_empty() && self.engine.is_settled()
    }
}
