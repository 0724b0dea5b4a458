//! `cbe` headless harness: numbers the code blocks of a markdown file.
mod fences;
mod host;
mod report;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cbe_config::load_from;
use cbe_events::{
    CHANNEL_SEND_FAILURES, DelayedEventSource, EVENT_CHANNEL_CAP, Event, EventSourceRegistry,
    HostEvent, TICKS_EMITTED, TickEventSource,
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::host::{Pane, Session};

const TICK_INTERVAL: Duration = Duration::from_millis(25);
/// Extra time after the last scheduled event before giving up on settling.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "cbe", version, about = "Code block line-number layout report")]
struct Args {
    /// Markdown file to render.
    pub path: PathBuf,
    /// Optional configuration file path (overrides discovery of `cbe.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Content width of the pane in pixels.
    #[arg(long, default_value_t = 600.0)]
    pub width: f64,
    /// Resize the pane to this width once the first layout settled.
    #[arg(long = "resize-to")]
    pub resize_to: Option<f64>,
    /// Narrow glyph width in pixels.
    #[arg(long, default_value_t = 8.0)]
    pub narrow: f64,
    /// Wide glyph width in pixels.
    #[arg(long, default_value_t = 16.0)]
    pub wide: f64,
    /// Height of one display row in pixels.
    #[arg(long = "line-height", default_value_t = 20.0)]
    pub line_height: f64,
}

impl Args {
    fn pane(&self) -> Pane {
        Pane {
            content_width: self.width,
            narrow: self.narrow,
            wide: self.wide,
            line_height: self.line_height,
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("cbe.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "cbe.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}

struct Runtime {
    session: Session,
    rx: mpsc::Receiver<Event>,
    resize_pending: bool,
}

impl Runtime {
    async fn run(&mut self) {
        let span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter = span.enter();
        while let Some(event) = self.rx.recv().await {
            let now = Instant::now();
            match event {
                Event::Tick => self.session.tick(now),
                Event::Host(host) => self.handle_host(host, now),
                Event::Shutdown => {
                    warn!(target: "runtime", "shutdown_before_settle");
                    break;
                }
            }
            if !self.resize_pending && self.session.is_done() {
                trace!(target: "runtime", "layout_settled");
                break;
            }
        }
        self.rx.close();
    }

    fn handle_host(&mut self, event: HostEvent, now: Instant) {
        match event {
            HostEvent::Resize { width_px } => {
                self.resize_pending = false;
                let queued = self.session.resize(width_px, now);
                info!(target: "runtime", width_px, queued, "pane_resized");
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    let config = load_from(args.config.clone())?;
    info!(target: "runtime", config_file = config.raw.is_some(), "startup");
    let markdown = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    let source = args.path.display().to_string();
    let blocks = fences::discover(&markdown);
    let mut session = Session::new(&config.file, args.pane());
    session.render(&source, blocks, Instant::now());

    let layout = &config.file.layout;
    let first_layout = layout.settle_quiet() + layout.probe_delay() + TICK_INTERVAL * 4;
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let mut deadline = first_layout;
    if let Some(width_px) = args.resize_to {
        registry.register(DelayedEventSource::new(
            first_layout,
            Event::Host(HostEvent::Resize { width_px }),
        ));
        deadline += layout.probe_delay() + TICK_INTERVAL * 4;
    }
    registry.register(DelayedEventSource::new(
        deadline + SHUTDOWN_GRACE,
        Event::Shutdown,
    ));
    let handles = registry.spawn_all(&tx);
    drop(tx);

    let mut runtime = Runtime {
        session,
        rx,
        resize_pending: args.resize_to.is_some(),
    };
    runtime.run().await;
    for handle in handles {
        handle.abort();
    }

    let engine = &mut runtime.session.engine;
    let mut out = String::from(report::HEADER);
    out.push('\n');
    for id in engine.block_ids() {
        if let (Some(meta), Some(markers)) = (engine.lookup(id), engine.markers(id)) {
            report::write_block(&mut out, meta, markers);
        }
    }
    print!("{out}");

    let counters = engine.counters().snapshot();
    info!(target: "runtime", ?counters, "engine_counters");
    info!(
        target: "runtime",
        ticks = TICKS_EMITTED.load(Ordering::Relaxed),
        send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
        "event_telemetry"
    );
    engine.clear_observer_cache();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbe_config::ConfigFile;

    fn pane(content_width: f64) -> Pane {
        Pane {
            content_width,
            narrow: 10.0,
            wide: 20.0,
            line_height: 16.0,
        }
    }

    fn tick_until_done(session: &mut Session, mut now: Instant) -> Instant {
        for _ in 0..100 {
            now += Duration::from_millis(50);
            session.tick(now);
            if session.is_done() {
                break;
            }
        }
        now
    }

    #[test]
    fn resize_event_rewraps_settled_blocks() {
        let mut session = Session::new(&ConfigFile::default(), pane(100.0));
        let t0 = Instant::now();
        session.render("doc.md", fences::discover("```\nabcdefgh\n```\n"), t0);
        let now = tick_until_done(&mut session, t0);
        assert!(session.is_done());

        let (_tx, rx) = mpsc::channel::<Event>(1);
        let mut runtime = Runtime {
            session,
            rx,
            resize_pending: true,
        };
        runtime.handle_host(HostEvent::Resize { width_px: 50.0 }, now);
        assert!(!runtime.resize_pending);
        assert!(!runtime.session.is_done(), "resize schedules a remeasure");

        tick_until_done(&mut runtime.session, now);
        let engine = &runtime.session.engine;
        let id = engine.block_ids()[0];
        let heights: Vec<_> = engine
            .markers(id)
            .unwrap()
            .iter()
            .map(|m| m.height_px)
            .collect();
        assert_eq!(heights, vec![Some(32.0)]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_and_closes_channel() {
        let (tx, rx) = mpsc::channel::<Event>(4);
        let mut runtime = Runtime {
            session: Session::new(&ConfigFile::default(), pane(100.0)),
            rx,
            resize_pending: true,
        };
        tx.send(Event::Shutdown).await.unwrap();
        runtime.run().await;
        assert!(tx.try_send(Event::Tick).is_err());
    }

    #[test]
    fn args_defaults_and_overrides() {
        let args = Args::try_parse_from(["cbe", "notes.md"]).unwrap();
        assert_eq!(args.path, PathBuf::from("notes.md"));
        assert_eq!(
            args.pane(),
            Pane {
                content_width: 600.0,
                narrow: 8.0,
                wide: 16.0,
                line_height: 20.0,
            }
        );
        assert!(args.resize_to.is_none());

        let args = Args::try_parse_from([
            "cbe",
            "notes.md",
            "--width",
            "320",
            "--resize-to",
            "160",
            "--line-height",
            "18",
        ])
        .unwrap();
        assert_eq!(args.resize_to, Some(160.0));
        assert_eq!(args.pane().content_width, 320.0);
        assert_eq!(args.pane().line_height, 18.0);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(Args::try_parse_from(["cbe"]).is_err());
    }
}
