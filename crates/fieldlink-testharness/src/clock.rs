//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Virtual monotonic clock."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::{Duration, Instant};

use fieldlink_common::Clock;
use parking_lot::Mutex;

/// Clock whose `sleep` advances virtual time instead of blocking.
#[derive(Debug)]
pub struct FakeClock {
    origin: Instant,
    state: Mutex<FakeClockState>,
}

#[derive(Debug, Default)]
struct FakeClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            state: Mutex::new(FakeClockState::default()),
        })
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().offset
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.state.lock().offset += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_advances_and_records() {
        let clock = FakeClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(800));
        clock.advance(Duration::from_millis(200));
        assert_eq!(clock.now() - start, Duration::from_secs(1));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(800)]);
    }
}
