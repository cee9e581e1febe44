//! ---
//! fl_section: "02-transaction-engine"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Transport error types."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use thiserror::Error;

/// Failures while setting up the serial link. Exchange-time errors never use this type.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("unable to configure serial port {port}: {reason}")]
    Configure { port: String, reason: String },
}
