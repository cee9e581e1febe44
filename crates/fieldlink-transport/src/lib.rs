//! ---
//! fl_section: "02-transaction-engine"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Serial transport and command transaction engine."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Serial transport for the modem peripheral.
//!
//! [`Transactor`] is the only component that touches the byte stream. Every
//! command exchange drains unsolicited input first so a response can never be
//! attributed to the wrong command. I/O failures are logged and surface as empty
//! responses or `false`; callers decide whether to retry.

mod channel;
mod error;
mod serial;
mod transactor;

pub use channel::SerialChannel;
pub use error::TransportError;
pub use serial::SerialPortChannel;
pub use transactor::{PollOutcome, Transactor, LINE_TERMINATOR, PROMPT};
