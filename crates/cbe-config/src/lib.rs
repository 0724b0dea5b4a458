//! Configuration loading and parsing.
//!
//! Parses `cbe.toml` (or an override path provided by the binary/host glue)
//! into two sections:
//!
//! * `[display]` mirrors the host plugin settings the line-number engine reads:
//!   whether line numbers are shown at all, which languages are excluded, and
//!   what hovering or clicking a line number does.
//! * `[layout]` holds engine tuning: the settle debounce, the deferred probe
//!   delay, the fallback tab width, the row-overflow comparison and the probe
//!   sample glyphs.
//!
//! Unknown fields are ignored so older binaries tolerate newer files. A file
//! that fails to parse falls back to defaults with a warning; a missing file
//! is not an error.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "cbe.toml";

/// What happens when the pointer hovers a line number.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HoverMode {
    None,
    #[default]
    Highlight,
}

/// What happens when a line number is clicked.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClickMode {
    #[default]
    None,
    /// Copy the logical line's text.
    Copy,
    /// Toggle a pinned highlight on the line.
    Highlight,
}

/// Row-overflow comparison used by the wrap estimator.
///
/// `Strict` starts a new row only once the accumulated width exceeds the
/// content width; `Inclusive` already does so when it reaches it exactly.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Strict,
    Inclusive,
}

impl OverflowPolicy {
    /// True when `accumulated` no longer fits in `available`.
    #[inline]
    pub fn overflows(self, accumulated: f64, available: f64) -> bool {
        match self {
            OverflowPolicy::Strict => accumulated > available,
            OverflowPolicy::Inclusive => accumulated >= available,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_show_line_number")]
    pub show_line_number: bool,
    #[serde(default)]
    pub exclude_langs: Vec<String>,
    #[serde(default)]
    pub linenum_hover_mode: HoverMode,
    #[serde(default)]
    pub linenum_click_mode: ClickMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_line_number: Self::default_show_line_number(),
            exclude_langs: Vec::new(),
            linenum_hover_mode: HoverMode::default(),
            linenum_click_mode: ClickMode::default(),
        }
    }
}

impl DisplayConfig {
    const fn default_show_line_number() -> bool {
        true
    }

    /// True when blocks of `lang` are filtered out before the engine sees them.
    /// Matches the `language-<name>` class exactly, so case matters.
    pub fn is_excluded(&self, lang: &str) -> bool {
        self.exclude_langs.iter().any(|excluded| excluded == lang)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "LayoutConfig::default_settle_quiet_ms")]
    pub settle_quiet_ms: u64,
    #[serde(default = "LayoutConfig::default_probe_delay_ms")]
    pub probe_delay_ms: u64,
    #[serde(default = "LayoutConfig::default_tab_width")]
    pub default_tab_width: u32,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default = "LayoutConfig::default_narrow_sample")]
    pub narrow_sample: String,
    #[serde(default = "LayoutConfig::default_wide_sample")]
    pub wide_sample: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            settle_quiet_ms: Self::default_settle_quiet_ms(),
            probe_delay_ms: Self::default_probe_delay_ms(),
            default_tab_width: Self::default_tab_width(),
            overflow: OverflowPolicy::default(),
            narrow_sample: Self::default_narrow_sample(),
            wide_sample: Self::default_wide_sample(),
        }
    }
}

impl LayoutConfig {
    const fn default_settle_quiet_ms() -> u64 {
        500
    }
    const fn default_probe_delay_ms() -> u64 {
        200
    }
    const fn default_tab_width() -> u32 {
        4
    }
    fn default_narrow_sample() -> String {
        "A".to_owned()
    }
    fn default_wide_sample() -> String {
        "好".to_owned()
    }

    pub fn settle_quiet(&self) -> Duration {
        Duration::from_millis(self.settle_quiet_ms)
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // file contents as read (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path: working directory first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("cbe").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            let mut cfg = Config {
                raw: Some(content),
                file,
            };
            cfg.normalize();
            Ok(cfg)
        }
        Err(e) => {
            warn!(
                target: "config",
                path = %path.display(),
                error = %e,
                "config_parse_failed_using_defaults"
            );
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Clamp values the engine cannot work with. Returns true when anything changed.
    pub fn normalize(&mut self) -> bool {
        let layout = &mut self.file.layout;
        let mut changed = false;
        if layout.default_tab_width == 0 {
            info!(target: "config", raw = 0, clamped = 1, "default_tab_width_clamped");
            layout.default_tab_width = 1;
            changed = true;
        }
        if layout.narrow_sample.is_empty() {
            info!(target: "config", "narrow_sample_empty_reset");
            layout.narrow_sample = LayoutConfig::default_narrow_sample();
            changed = true;
        }
        if layout.wide_sample.is_empty() {
            info!(target: "config", "wide_sample_empty_reset");
            layout.wide_sample = LayoutConfig::default_wide_sample();
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), body).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert!(cfg.file.display.show_line_number);
        assert_eq!(cfg.file.layout.settle_quiet_ms, 500);
        assert_eq!(cfg.file.layout.probe_delay_ms, 200);
        assert_eq!(cfg.file.layout.default_tab_width, 4);
        assert_eq!(cfg.file.layout.overflow, OverflowPolicy::Strict);
        assert_eq!(cfg.file.layout.narrow_sample, "A");
        assert_eq!(cfg.file.layout.wide_sample, "好");
    }

    #[test]
    fn parses_display_section() {
        let tmp = write_config(
            "[display]\nshow_line_number = false\nexclude_langs = [\"mermaid\", \"dataview\"]\nlinenum_hover_mode = \"none\"\nlinenum_click_mode = \"copy\"\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let display = &cfg.file.display;
        assert!(!display.show_line_number);
        assert!(display.is_excluded("mermaid"));
        assert!(display.is_excluded("dataview"));
        assert!(!display.is_excluded("DataView"), "exclusion is case-sensitive");
        assert!(!display.is_excluded("rust"));
        assert_eq!(display.linenum_hover_mode, HoverMode::None);
        assert_eq!(display.linenum_click_mode, ClickMode::Copy);
    }

    #[test]
    fn parses_layout_section() {
        let tmp = write_config(
            "[layout]\nsettle_quiet_ms = 250\nprobe_delay_ms = 0\ndefault_tab_width = 2\noverflow = \"inclusive\"\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let layout = &cfg.file.layout;
        assert_eq!(layout.settle_quiet(), Duration::from_millis(250));
        assert_eq!(layout.probe_delay(), Duration::ZERO);
        assert_eq!(layout.default_tab_width, 2);
        assert_eq!(layout.overflow, OverflowPolicy::Inclusive);
    }

    #[test]
    fn overflow_policy_boundaries() {
        assert!(!OverflowPolicy::Strict.overflows(100.0, 100.0));
        assert!(OverflowPolicy::Strict.overflows(100.5, 100.0));
        assert!(OverflowPolicy::Inclusive.overflows(100.0, 100.0));
        assert!(!OverflowPolicy::Inclusive.overflows(99.9, 100.0));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let tmp = write_config("[layout\nsettle_quiet_ms = ");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file.layout.settle_quiet_ms, 500);
    }

    #[test]
    fn unknown_fields_ignored() {
        let tmp = write_config("[display]\nshow_lang_name = true\n[layout]\nfuture_knob = 3\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_some());
        assert!(cfg.file.display.show_line_number);
    }

    #[test]
    fn zero_tab_width_clamp_logs_under_config_target() {
        let tmp = write_config("[layout]\ndefault_tab_width = 0\nwide_sample = \"\"\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || {
            load_from(Some(tmp.path().to_path_buf())).unwrap()
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("default_tab_width_clamped"));
        assert!(log_output.contains("wide_sample_empty_reset"));
        assert_eq!(cfg.file.layout.default_tab_width, 1);
        assert_eq!(cfg.file.layout.wide_sample, "好");
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut cfg = Config::default();
        assert!(!cfg.normalize());
        cfg.file.layout.default_tab_width = 0;
        assert!(cfg.normalize());
        assert!(!cfg.normalize());
    }
}
