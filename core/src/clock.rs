//! Simulation clock. Resolves "now", owns pause state and the frame counter.
//!
//! RULE: every time-dependent decision reads time through `SimClock::now()`.
//! While paused, `now()` returns the timestamp captured at pause-start, so a
//! paused simulation behaves exactly as if time had stopped.

use crate::types::{Millis, Tick};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where live time comes from.
pub trait TimeSource: Send {
    fn now_ms(&self) -> Millis;
}

/// Wall-clock milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_ms(&self) -> Millis {
        chrono::Utc::now().timestamp_millis() as Millis
    }
}

/// Hand-driven time for headless runs and tests.
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    bits: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn starting_at(now: Millis) -> Self {
        Self { bits: Arc::new(AtomicU64::new(now.to_bits())) }
    }

    pub fn set(&self, now: Millis) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Millis) -> Millis {
        let next = self.get() + delta;
        self.set(next);
        next
    }

    pub fn get(&self) -> Millis {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> Millis {
        self.get()
    }
}

pub struct SimClock {
    pub current_tick: Tick,
    source:           Box<dyn TimeSource>,
    paused_at:        Option<Millis>,
}

impl SimClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            current_tick: 0,
            source,
            paused_at: None,
        }
    }

    pub fn wall() -> Self {
        Self::new(Box::new(WallClock))
    }

    pub fn manual(time: ManualTime) -> Self {
        Self::new(Box::new(time))
    }

    /// The frozen pause timestamp when paused, live time otherwise.
    pub fn now(&self) -> Millis {
        self.paused_at.unwrap_or_else(|| self.source.now_ms())
    }

    /// Live time, ignoring pause. Loads rebase against this, not the
    /// frozen timestamp.
    pub fn live_now(&self) -> Millis {
        self.source.now_ms()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Capture `now()` once. Pausing twice keeps the first capture.
    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.source.now_ms());
        }
    }

    /// Clear the frozen timestamp. Returns how long the clock was frozen.
    pub fn resume(&mut self) -> Millis {
        match self.paused_at.take() {
            Some(paused_at) => (self.source.now_ms() - paused_at).max(0.0),
            None => 0.0,
        }
    }

    /// Advance the frame counter. Returns the new tick number.
    pub fn advance(&mut self) -> Tick {
        self.current_tick += 1;
        self.current_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_returns_frozen_time() {
        let time = ManualTime::starting_at(1_000.0);
        let mut clock = SimClock::manual(time.clone());

        clock.pause();
        time.advance(5_000.0);
        assert_eq!(clock.now(), 1_000.0);

        // A second pause does not move the capture.
        clock.pause();
        assert_eq!(clock.now(), 1_000.0);

        let frozen_for = clock.resume();
        assert_eq!(frozen_for, 5_000.0);
        assert_eq!(clock.now(), 6_000.0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn live_now_ignores_pause() {
        let time = ManualTime::starting_at(0.0);
        let mut clock = SimClock::manual(time.clone());
        clock.pause();
        time.advance(2_500.0);
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.live_now(), 2_500.0);
    }

    #[test]
    fn resume_without_pause_is_zero() {
        let mut clock = SimClock::manual(ManualTime::starting_at(0.0));
        assert_eq!(clock.resume(), 0.0);
    }
}
