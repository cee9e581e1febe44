//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Status indicator and display abstractions."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::time::Clock;

/// Maximum number of text lines a status display can hold.
pub const DISPLAY_LINES: usize = 4;

/// Single on/off status light.
pub trait Indicator: Send + Sync {
    fn set(&self, on: bool);
}

/// Small text display showing the current stage.
pub trait StatusDisplay: Send + Sync {
    fn show(&self, lines: &[&str]);
}

pub type SharedIndicator = Arc<dyn Indicator>;
pub type SharedDisplay = Arc<dyn StatusDisplay>;

/// Indicator used when no light is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl Indicator for NoIndicator {
    fn set(&self, _on: bool) {}
}

/// LED exposed through a sysfs brightness file.
#[derive(Debug, Clone)]
pub struct SysfsLed {
    path: PathBuf,
}

impl SysfsLed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Indicator for SysfsLed {
    fn set(&self, on: bool) {
        let value = if on { "1" } else { "0" };
        if let Err(err) = fs::write(&self.path, value) {
            debug!(path = %self.path.display(), error = %err, "indicator write failed");
        }
    }
}

/// Display used when none is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDisplay;

impl StatusDisplay for NoDisplay {
    fn show(&self, _lines: &[&str]) {}
}

/// Display that mirrors its content into the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&self, lines: &[&str]) {
        info!(display = %lines.join(" | "), "status display");
    }
}

/// Show up to [`DISPLAY_LINES`] lines, dropping the rest.
pub fn show_lines(display: &dyn StatusDisplay, lines: &[&str]) {
    let end = lines.len().min(DISPLAY_LINES);
    display.show(&lines[..end]);
}

/// Fixed light patterns signalling progress to someone standing next to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPattern {
    /// Five quick flashes after a stage completes.
    Success,
    /// Three slow flashes for a failure.
    Error,
    /// One short flash per pending attempt.
    Connecting,
    /// Brief flash after an accepted publish.
    Ack,
}

impl BlinkPattern {
    /// `(repeats, on, off)` for the pattern.
    pub fn timing(self) -> (u32, Duration, Duration) {
        match self {
            BlinkPattern::Success => (5, Duration::from_millis(100), Duration::from_millis(100)),
            BlinkPattern::Error => (3, Duration::from_millis(500), Duration::from_millis(500)),
            BlinkPattern::Connecting => (1, Duration::from_millis(200), Duration::from_millis(200)),
            BlinkPattern::Ack => (1, Duration::from_millis(150), Duration::ZERO),
        }
    }

    /// Drive the pattern to completion; the light is left off.
    pub fn play(self, indicator: &dyn Indicator, clock: &dyn Clock) {
        let (repeats, on, off) = self.timing();
        for _ in 0..repeats {
            indicator.set(true);
            clock.sleep(on);
            indicator.set(false);
            clock.sleep(off);
        }
    }
}

/// Indicator and display bundled for the stages that report progress.
#[derive(Clone)]
pub struct Feedback {
    indicator: SharedIndicator,
    display: SharedDisplay,
}

impl Feedback {
    pub fn new(indicator: SharedIndicator, display: SharedDisplay) -> Self {
        Self { indicator, display }
    }

    /// No light, no display.
    pub fn silent() -> Self {
        Self::new(Arc::new(NoIndicator), Arc::new(NoDisplay))
    }

    pub fn show(&self, lines: &[&str]) {
        show_lines(self.display.as_ref(), lines);
    }

    pub fn light(&self, on: bool) {
        self.indicator.set(on);
    }

    pub fn blink(&self, pattern: BlinkPattern, clock: &dyn Clock) {
        pattern.play(self.indicator.as_ref(), clock);
    }

    pub fn indicator(&self) -> &dyn Indicator {
        self.indicator.as_ref()
    }
}

impl std::fmt::Debug for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feedback").finish_non_exhaustive()
    }
}
