//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Test harness exports."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Deterministic doubles for driving the gateway without hardware.
//!
//! Everything here runs on [`FakeClock`] virtual time, so a full bring-up with
//! its multi-second waits completes instantly.

mod clock;
mod modem;
mod recorders;

pub use clock::FakeClock;
pub use modem::{Reply, SimulatedModem, TranscriptEntry};
pub use recorders::{RecordingDisplay, RecordingIndicator, ScriptedTelemetry};
