//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Simulated sensor collaborator."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Stand-in for the environmental sensors on hosts without them.

pub mod generator;

pub use generator::SimulatedSensors;
