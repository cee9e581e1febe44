//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Interval gate and heartbeat cadence."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use fieldlink_common::{Clock, Indicator};

/// Fires once `interval` has elapsed since the last mark.
#[derive(Debug, Clone)]
pub struct IntervalGate {
    interval: Duration,
    last: Instant,
}

impl IntervalGate {
    /// Starts marked at `now`, so the first firing is one interval away.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.interval
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// One on/off cycle of the status light per run loop iteration.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    on: Duration,
    off: Duration,
}

impl Heartbeat {
    pub fn new(on: Duration, off: Duration) -> Self {
        Self { on, off }
    }

    pub fn period(&self) -> Duration {
        self.on + self.off
    }

    pub fn beat(&self, indicator: &dyn Indicator, clock: &dyn Clock) {
        indicator.set(true);
        clock.sleep(self.on);
        indicator.set(false);
        clock.sleep(self.off);
    }
}
