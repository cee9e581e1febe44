//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Terminal halt loop."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::time::Duration;

use fieldlink_common::{BlinkPattern, Clock, Feedback};
use tracing::error;

use crate::signal::StopSignal;

/// Repeat the error pattern until the process is stopped. Never resumes bring-up.
///
/// Returns the number of completed error cycles.
pub fn halt(feedback: &Feedback, clock: &dyn Clock, pause: Duration, stop: &StopSignal, reason: &str) -> u64 {
    error!(reason, "bring-up halted, reset required");
    feedback.show(&["FieldLink", "HALTED", reason]);
    let mut cycles = 0;
    while !stop.is_triggered() {
        feedback.blink(BlinkPattern::Error, clock);
        clock.sleep(pause);
        cycles += 1;
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldlink_common::{Indicator, NoDisplay};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Instant;

    struct StopAfter {
        flashes: Mutex<u32>,
        limit: u32,
        stop: StopSignal,
    }

    impl Indicator for StopAfter {
        fn set(&self, on: bool) {
            if on {
                let mut flashes = self.flashes.lock();
                *flashes += 1;
                if *flashes >= self.limit {
                    self.stop.trigger();
                }
            }
        }
    }

    struct Virtual(Mutex<Duration>, Instant);

    impl Clock for Virtual {
        fn now(&self) -> Instant {
            self.1 + *self.0.lock()
        }

        fn sleep(&self, duration: Duration) {
            *self.0.lock() += duration;
        }
    }

    #[test]
    fn halt_blinks_error_pattern_until_stopped() {
        let stop = StopSignal::new();
        let lamp = Arc::new(StopAfter {
            flashes: Mutex::new(0),
            limit: 6,
            stop: stop.clone(),
        });
        let feedback = Feedback::new(lamp.clone(), Arc::new(NoDisplay));
        let clock = Virtual(Mutex::new(Duration::ZERO), Instant::now());

        let cycles = halt(&feedback, &clock, Duration::from_secs(2), &stop, "registration");

        assert_eq!(cycles, 2);
        assert_eq!(*lamp.flashes.lock(), 6);
        assert_eq!(*clock.0.lock(), Duration::from_secs(10));
    }

    #[test]
    fn halt_returns_immediately_when_already_stopped() {
        let stop = StopSignal::new();
        stop.trigger();
        let clock = Virtual(Mutex::new(Duration::ZERO), Instant::now());
        assert_eq!(halt(&Feedback::silent(), &clock, Duration::from_secs(2), &stop, "x"), 0);
    }
}
