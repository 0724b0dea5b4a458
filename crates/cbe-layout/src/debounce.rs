//! Deadline timers driven by an explicit clock.
//!
//! The engine never sleeps or spawns; callers pass the current `Instant`
//! into every entry point and timers fire from `on_tick`. This keeps the state
//! machines deterministic under test (a virtual clock is just an `Instant`
//! advanced by hand).

use std::time::{Duration, Instant};

/// Trailing-edge debounce: fires once `quiet` has elapsed since the last touch.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Start (or restart) the quiet period at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Restart the quiet period if armed. Returns false when not armed.
    pub fn touch(&mut self, now: Instant) -> bool {
        if self.deadline.is_none() {
            return false;
        }
        self.arm(now);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// One-shot: returns true exactly once when the deadline has passed, then disarms.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
