//! ---
//! fl_section: "03-logging-metrics"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Structured logging context and stage events."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging helpers shared by the bring-up and session crates.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline tracing subscriber suitable for tests and tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Bring-up or session stage the event belongs to.
    pub stage: Option<&'a str>,
    /// One-based attempt number within a retried stage.
    pub attempt: Option<u32>,
    /// Command text being exchanged with the peripheral.
    pub command: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context scoped to a single stage.
    pub fn stage(stage: &'a str) -> Self {
        Self::new().with_stage(stage)
    }

    /// Attach a stage name.
    pub fn with_stage(mut self, stage: &'a str) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach an attempt number.
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attach the command being exchanged.
    pub fn with_command(mut self, command: &'a str) -> Self {
        self.command = Some(command);
        self
    }
}

/// Outcome attached to a stage lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage completed as expected.
    Success,
    /// The stage continued but a best-effort step did not confirm.
    Degraded,
    /// The stage failed.
    Fault,
}

impl StageOutcome {
    /// Stable lowercase label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Success => "success",
            StageOutcome::Degraded => "degraded",
            StageOutcome::Fault => "fault",
        }
    }

    /// Level the event is emitted at.
    pub fn level(&self) -> Level {
        match self {
            StageOutcome::Success => Level::INFO,
            StageOutcome::Degraded => Level::WARN,
            StageOutcome::Fault => Level::ERROR,
        }
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit a standardized stage event with its outcome.
pub fn log_stage_event(context: Option<&LogContext>, event: &str, message: &str, outcome: StageOutcome) {
    let ctx = context.copied().unwrap_or_default();
    match outcome {
        StageOutcome::Success => {
            crate::fl_info!(context = ctx, "{} [{}] {}", event, outcome.as_str(), message)
        }
        StageOutcome::Degraded => {
            crate::fl_warn!(context = ctx, "{} [{}] {}", event, outcome.as_str(), message)
        }
        StageOutcome::Fault => {
            crate::fl_error!(context = ctx, "{} [{}] {}", event, outcome.as_str(), message)
        }
    }
}
