//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Recording indicator, display, and scripted telemetry doubles."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fieldlink_common::{Indicator, SensorReading, SharedClock, StatusDisplay, TelemetrySource};
use parking_lot::Mutex;

/// Indicator that records every state change with its virtual timestamp.
pub struct RecordingIndicator {
    clock: SharedClock,
    origin: Instant,
    events: Mutex<Vec<(Duration, bool)>>,
}

impl RecordingIndicator {
    pub fn new(clock: SharedClock) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            events: Mutex::new(Vec::new()),
        }
    }

    /// `(offset from construction, state)` for every `set` call.
    pub fn events(&self) -> Vec<(Duration, bool)> {
        self.events.lock().clone()
    }

    /// Number of times the light was switched on.
    pub fn flashes(&self) -> usize {
        self.events.lock().iter().filter(|(_, on)| *on).count()
    }

    pub fn is_on(&self) -> bool {
        self.events.lock().last().map(|(_, on)| *on).unwrap_or(false)
    }
}

impl Indicator for RecordingIndicator {
    fn set(&self, on: bool) {
        let offset = self.clock.now().saturating_duration_since(self.origin);
        self.events.lock().push((offset, on));
    }
}

/// Display that keeps every frame it was asked to show.
#[derive(Default)]
pub struct RecordingDisplay {
    frames: Mutex<Vec<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<String>> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<Vec<String>> {
        self.frames.lock().last().cloned()
    }

    /// True when any line of any frame contains `needle`.
    pub fn showed(&self, needle: &str) -> bool {
        self.frames
            .lock()
            .iter()
            .flatten()
            .any(|line| line.contains(needle))
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&self, lines: &[&str]) {
        self.frames
            .lock()
            .push(lines.iter().map(|line| (*line).to_owned()).collect());
    }
}

/// Telemetry source replaying queued readings, then repeating a fixed one.
#[derive(Debug, Default)]
pub struct ScriptedTelemetry {
    queued: VecDeque<SensorReading>,
    steady: SensorReading,
    reads: usize,
}

impl ScriptedTelemetry {
    pub fn steady(reading: SensorReading) -> Self {
        Self {
            queued: VecDeque::new(),
            steady: reading,
            reads: 0,
        }
    }

    pub fn then(mut self, reading: SensorReading) -> Self {
        self.queued.push_back(reading);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn read(&mut self) -> SensorReading {
        self.reads += 1;
        self.queued.pop_front().unwrap_or(self.steady)
    }
}
