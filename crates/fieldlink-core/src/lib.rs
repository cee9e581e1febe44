//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Gateway bring-up and run loop."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Drives the modem from power-off to a connected publish session, then
//! publishes telemetry on a fixed schedule until stopped.

pub mod error;
pub mod gateway;
pub mod state;

pub use error::BringUpError;
pub use gateway::Gateway;
pub use state::{GatewayState, PeripheralState};
