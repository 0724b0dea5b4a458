//! Engine counters.
//!
//! Plain relaxed atomics so the harness can read them without borrowing the
//! engine mutably. They are diagnostic only; nothing branches on them.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineCounters {
    /// Blocks that passed the render checks and got an id.
    pub blocks_registered: AtomicU64,
    /// Render calls that were no-ops (no content, excluded language, disabled).
    pub blocks_skipped: AtomicU64,
    /// Marker rows built across all blocks.
    pub markers_built: AtomicU64,
    pub probe_attempts: AtomicU64,
    /// Probes that left the cache invalid (zero line height, bad glyph width).
    pub probe_failures: AtomicU64,
    /// Per-block restyles (height recompute + highlight toggle).
    pub restyled_blocks: AtomicU64,
    /// Callbacks that arrived for a destroyed or unknown block.
    pub stale_callbacks: AtomicU64,
    pub resize_cycles: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineCountersSnapshot {
    pub blocks_registered: u64,
    pub blocks_skipped: u64,
    pub markers_built: u64,
    pub probe_attempts: u64,
    pub probe_failures: u64,
    pub restyled_blocks: u64,
    pub stale_callbacks: u64,
    pub resize_cycles: u64,
}

impl EngineCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineCountersSnapshot {
        EngineCountersSnapshot {
            blocks_registered: self.blocks_registered.load(Ordering::Relaxed),
            blocks_skipped: self.blocks_skipped.load(Ordering::Relaxed),
            markers_built: self.markers_built.load(Ordering::Relaxed),
            probe_attempts: self.probe_attempts.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            restyled_blocks: self.restyled_blocks.load(Ordering::Relaxed),
            stale_callbacks: self.stale_callbacks.load(Ordering::Relaxed),
            resize_cycles: self.resize_cycles.load(Ordering::Relaxed),
        }
    }
}
