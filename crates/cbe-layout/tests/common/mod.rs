#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cbe_config::{ConfigFile, DisplayConfig, LayoutConfig};
use cbe_layout::{
    BlockId, BlockSurface, EngineOptions, LineMarker, LineNumberEngine, MutationWatch,
    ProbeDisplay, ProbeHost, ProbeRect, RenderedBlock, SectionContext, VisibilityEntry,
    VisibilityNotifier,
};
use cbe_text::{GlyphClass, classify_char};

pub const NARROW: f64 = 10.0;
pub const WIDE: f64 = 20.0;
pub const LINE_HEIGHT: f64 = 16.0;

/// Host-side state of one fake block, shared between the test and the surface.
#[derive(Debug)]
pub struct SurfaceState {
    pub content_width: f64,
    pub line_height: f64,
    pub tab_size: Option<u32>,
    pub probes_inserted: u32,
    pub probes_removed: u32,
    pub mounted: Vec<LineMarker>,
    /// Latest styled value per line.
    pub rows: Vec<LineMarker>,
    pub style_calls: usize,
    pub has_line_numbers: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            content_width: 100.0,
            line_height: LINE_HEIGHT,
            tab_size: None,
            probes_inserted: 0,
            probes_removed: 0,
            mounted: Vec::new(),
            rows: Vec::new(),
            style_calls: 0,
            has_line_numbers: false,
        }
    }
}

pub type Shared<T> = Rc<RefCell<T>>;

pub struct FakeSurface(pub Shared<SurfaceState>);

impl ProbeHost for FakeSurface {
    fn insert_probe(&mut self) {
        self.0.borrow_mut().probes_inserted += 1;
    }

    fn measure_probe(&mut self, text: &str, display: ProbeDisplay) -> ProbeRect {
        let s = self.0.borrow();
        match display {
            ProbeDisplay::Inline => ProbeRect {
                width: text
                    .chars()
                    .map(|c| match classify_char(c) {
                        GlyphClass::Narrow => NARROW,
                        GlyphClass::Wide => WIDE,
                    })
                    .sum(),
                height: s.line_height,
            },
            ProbeDisplay::Block => ProbeRect {
                width: s.content_width,
                height: s.line_height,
            },
        }
    }

    fn remove_probe(&mut self) {
        self.0.borrow_mut().probes_removed += 1;
    }

    fn content_width(&self) -> f64 {
        self.0.borrow().content_width
    }

    fn tab_size(&self) -> Option<u32> {
        self.0.borrow().tab_size
    }
}

impl BlockSurface for FakeSurface {
    fn mount_markers(&mut self, markers: &[LineMarker]) {
        let mut s = self.0.borrow_mut();
        s.mounted.extend_from_slice(markers);
        s.rows = markers.to_vec();
    }

    fn style_marker(&mut self, marker: &LineMarker) {
        let mut s = self.0.borrow_mut();
        s.style_calls += 1;
        if let Some(row) = s.rows.iter_mut().find(|r| r.line == marker.line) {
            *row = marker.clone();
        }
    }

    fn set_line_numbers_class(&mut self, on: bool) {
        self.0.borrow_mut().has_line_numbers = on;
    }
}

/// Section whose fence line the test can edit after rendering.
pub struct FakeSection {
    pub key: String,
    pub fence: Shared<Option<String>>,
}

impl SectionContext for FakeSection {
    fn source_key(&self) -> String {
        self.key.clone()
    }

    fn fence_line(&self) -> Option<String> {
        self.fence.borrow().clone()
    }
}

#[derive(Debug, Default)]
pub struct NotifierLog {
    pub observed: BTreeSet<BlockId>,
    pub observe_calls: Vec<BlockId>,
    pub unobserved: Vec<BlockId>,
    pub disconnects: u32,
}

#[derive(Clone, Default)]
pub struct FakeNotifier(pub Shared<NotifierLog>);

impl VisibilityNotifier for FakeNotifier {
    fn observe(&mut self, id: BlockId) {
        let mut log = self.0.borrow_mut();
        log.observed.insert(id);
        log.observe_calls.push(id);
    }

    fn unobserve(&mut self, id: BlockId) {
        let mut log = self.0.borrow_mut();
        log.observed.remove(&id);
        log.unobserved.push(id);
    }

    fn disconnect_all(&mut self) {
        let mut log = self.0.borrow_mut();
        log.observed.clear();
        log.disconnects += 1;
    }
}

#[derive(Clone, Default)]
pub struct FakeWatch(pub Shared<BTreeSet<BlockId>>);

impl MutationWatch for FakeWatch {
    fn arm(&mut self, id: BlockId) {
        self.0.borrow_mut().insert(id);
    }

    fn disarm(&mut self, id: BlockId) {
        self.0.borrow_mut().remove(&id);
    }
}

pub type Engine = LineNumberEngine<FakeNotifier, FakeWatch>;

/// Engine plus handles on its fakes and a virtual clock.
pub struct Harness {
    pub engine: Engine,
    pub notifier: Shared<NotifierLog>,
    pub watched: Shared<BTreeSet<BlockId>>,
    pub now: Instant,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ConfigFile::default())
    }

    pub fn with_display(display: DisplayConfig) -> Self {
        Self::with_config(ConfigFile {
            display,
            layout: LayoutConfig::default(),
        })
    }

    pub fn with_config(file: ConfigFile) -> Self {
        let notifier = FakeNotifier::default();
        let watch = FakeWatch::default();
        let handles = (notifier.0.clone(), watch.0.clone());
        Self {
            engine: LineNumberEngine::new(EngineOptions::from(&file), notifier, watch),
            notifier: handles.0,
            watched: handles.1,
            now: Instant::now(),
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.engine.on_tick(self.now);
    }

    /// Render a `language-rust` block with the given content and fence line.
    pub fn render(&mut self, content: &str, fence: &str) -> Option<Rendered> {
        self.render_with("rust", Some(content), fence)
    }

    pub fn render_with(
        &mut self,
        language: &str,
        content: Option<&str>,
        fence: &str,
    ) -> Option<Rendered> {
        let surface = Rc::new(RefCell::new(SurfaceState::default()));
        let fence = Rc::new(RefCell::new(Some(fence.to_owned())));
        let block = RenderedBlock {
            classes: vec!["hljs".to_owned(), format!("language-{language}")],
            content: content.map(str::to_owned),
            surface: Box::new(FakeSurface(surface.clone())),
            section: Box::new(FakeSection {
                key: "note.md:1".to_owned(),
                fence: fence.clone(),
            }),
        };
        let id = self.engine.render_block(block, self.now)?;
        Some(Rendered { id, surface, fence })
    }

    pub fn show(&mut self, ids: &[BlockId]) {
        let entries: Vec<_> = ids
            .iter()
            .map(|&id| VisibilityEntry { id, visible: true })
            .collect();
        self.engine.on_visibility(&entries, self.now);
    }

    pub fn hide(&mut self, ids: &[BlockId]) {
        let entries: Vec<_> = ids
            .iter()
            .map(|&id| VisibilityEntry { id, visible: false })
            .collect();
        self.engine.on_visibility(&entries, self.now);
    }

    /// Past the settle quiet period.
    pub fn settle(&mut self) {
        self.advance(500);
    }

    /// Past the deferred probe delay.
    pub fn probe(&mut self) {
        self.advance(200);
    }

    pub fn heights(&self, id: BlockId) -> Vec<Option<f64>> {
        self.engine
            .markers(id)
            .map(|ms| ms.iter().map(|m| m.height_px).collect())
            .unwrap_or_default()
    }
}

pub struct Rendered {
    pub id: BlockId,
    pub surface: Shared<SurfaceState>,
    pub fence: Shared<Option<String>>,
}

impl Rendered {
    pub fn probes(&self) -> u32 {
        self.surface.borrow().probes_inserted
    }
}
