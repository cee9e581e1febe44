//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Runtime helpers supporting the run loop."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Cooperative scheduling helpers for the single-threaded run loop.

pub mod halt;
pub mod scheduling;
pub mod signal;

pub use halt::halt;
pub use scheduling::{Heartbeat, IntervalGate};
pub use signal::StopSignal;
