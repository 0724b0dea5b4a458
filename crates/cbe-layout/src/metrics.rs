//! Shared glyph metrics for wrap estimation.
//!
//! All code blocks in a document share one CSS theme, so one set of glyph
//! measurements serves every block on screen. The cache is an explicit value
//! owned by the engine (tests build fixtures with [`MetricsCache::with_metrics`])
//! rather than a module-level singleton.
//!
//! Lifecycle:
//! * invalid until a measurement succeeds;
//! * invalidated on resize and on font/zoom changes;
//! * re-measured on demand through a visible block's [`ProbeHost`].
//!
//! A measurement with zero line height means the probe host was not laid out
//! (hidden pane, collapsed block). The cache then stays invalid and the last
//! measured numbers are kept only as "last known" values.

use cbe_config::LayoutConfig;
use thiserror::Error;
use tracing::debug;

use crate::surface::{ProbeDisplay, ProbeHost};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaseLineMetrics {
    /// Width of the narrow reference glyph.
    pub narrow_glyph_width: f64,
    /// Width of the wide reference glyph.
    pub wide_glyph_width: f64,
    /// Height of one display row.
    pub line_height_px: f64,
    /// Width available for text inside a code block.
    pub content_width_px: f64,
    pub tab_width_columns: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    #[error("probe line height was {0}px; content area not laid out")]
    ZeroLineHeight(f64),
    #[error("wide glyph width was {0}px")]
    NonPositiveGlyphWidth(f64),
}

#[derive(Debug, Clone)]
pub struct MetricsCache {
    metrics: BaseLineMetrics,
    valid: bool,
    /// Bumped after every successful measurement.
    generation: u64,
    narrow_sample: String,
    wide_sample: String,
    default_tab_width: u32,
}

impl MetricsCache {
    pub fn new(layout: &LayoutConfig) -> Self {
        Self {
            metrics: BaseLineMetrics::default(),
            valid: false,
            generation: 0,
            narrow_sample: layout.narrow_sample.clone(),
            wide_sample: layout.wide_sample.clone(),
            default_tab_width: layout.default_tab_width.max(1),
        }
    }

    /// A cache that is already valid with fixed metrics.
    pub fn with_metrics(layout: &LayoutConfig, metrics: BaseLineMetrics) -> Self {
        let mut cache = Self::new(layout);
        cache.metrics = metrics;
        cache.valid = true;
        cache.generation = 1;
        cache
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark the cache stale; the next consumer must re-measure first.
    pub fn invalidate(&mut self) {
        if self.valid {
            debug!(target: "layout.metrics", generation = self.generation, "metrics_invalidated");
        }
        self.valid = false;
    }

    /// Metrics if fresh.
    pub fn current(&self) -> Option<&BaseLineMetrics> {
        self.valid.then_some(&self.metrics)
    }

    /// Most recently measured values, fresh or not.
    pub fn last_known(&self) -> &BaseLineMetrics {
        &self.metrics
    }

    /// Return fresh metrics, measuring through `host` first when stale.
    pub fn ensure_fresh<H: ProbeHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<&BaseLineMetrics, MeasureError> {
        if !self.valid {
            self.measure(host)?;
        }
        Ok(&self.metrics)
    }

    /// Measure unconditionally. On failure the cache stays invalid.
    pub fn measure<H: ProbeHost + ?Sized>(&mut self, host: &mut H) -> Result<(), MeasureError> {
        host.insert_probe();
        let narrow = host
            .measure_probe(&self.narrow_sample, ProbeDisplay::Inline)
            .width;
        let wide = host
            .measure_probe(&self.wide_sample, ProbeDisplay::Inline)
            .width;
        let line_sample = format!("{}{}", self.narrow_sample, self.wide_sample);
        let line_height = host.measure_probe(&line_sample, ProbeDisplay::Block).height;
        let content_width = host.content_width();
        host.remove_probe();

        self.metrics = BaseLineMetrics {
            narrow_glyph_width: narrow,
            wide_glyph_width: wide,
            line_height_px: line_height,
            content_width_px: content_width,
            tab_width_columns: host
                .tab_size()
                .filter(|t| *t > 0)
                .unwrap_or(self.default_tab_width),
        };

        if line_height <= 0.0 {
            self.valid = false;
            return Err(MeasureError::ZeroLineHeight(line_height));
        }
        if wide <= 0.0 {
            self.valid = false;
            return Err(MeasureError::NonPositiveGlyphWidth(wide));
        }
        self.valid = true;
        self.generation += 1;
        debug!(
            target: "layout.metrics",
            generation = self.generation,
            narrow,
            wide,
            line_height,
            content_width,
            tab = self.metrics.tab_width_columns,
            "metrics_measured"
        );
        Ok(())
    }
}
