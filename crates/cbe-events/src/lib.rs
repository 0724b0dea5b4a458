//! Host event types and async event sources for the line-number runtime.
//!
//! The engine itself is synchronous and is driven one callback at a time. A
//! host runtime funnels everything that can wake it (timer ticks, pane
//! resizes, shutdown) through one bounded channel of [`Event`]s and applies
//! them in order on a single task.

use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Bounded capacity for the runtime channel. Producers await when full.
pub const EVENT_CHANNEL_CAP: usize = 1024;

// Telemetry: relaxed counters, inspected by tests and logged at shutdown.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static TICKS_EMITTED: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the runtime loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Host(HostEvent),
    /// Periodic monotonic tick that lets the engine fire due debounces and
    /// deferred probes without busy polling.
    Tick,
    Shutdown,
}

/// Notifications originating from the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Layout width of the document pane changed (pixels).
    Resize { width_px: f64 },
}

/// Trait implemented by any async event producer. Implementors hold their
/// configuration and spawn one background task pushing `Event`s into the
/// shared channel. They must stop once `tx.send(..)` fails (consumer gone).
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together once the channel exists.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source
    /// receives its own `Sender` clone; the caller keeps ownership of `tx` and
    /// should drop it before awaiting the handles during shutdown.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        // Draining prevents duplicate spawns if called twice.
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Built-in monotonic tick source. Emits `Event::Tick` every interval.
pub struct TickEventSource {
    interval: Duration,
}

impl TickEventSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
                TICKS_EMITTED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        })
    }
}

/// One-shot source emitting a fixed event after a delay (scripted resize and
/// the shutdown deadline in the headless harness).
pub struct DelayedEventSource {
    delay: Duration,
    event: Event,
}

impl DelayedEventSource {
    pub fn new(delay: Duration, event: Event) -> Self {
        Self { delay, event }
    }
}

impl AsyncEventSource for DelayedEventSource {
    fn name(&self) -> &'static str {
        "delayed"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let Self { delay, event } = *self;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).await.is_err() {
                CHANNEL_SEND_FAILURES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        })
    }
}
