//! ---
//! fl_section: "05-secure-session"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Secure session manager."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! TLS context setup, publish-service lifecycle, and the broker session that
//! carries telemetry.

mod error;
mod service;
mod session;
mod tls;

pub use error::{ConnectError, PublishError, SessionError};
pub use service::{start_service, stop_service};
pub use session::{ConnectPath, SessionManager, TeardownReport};
pub use tls::{configure_tls, TlsReport};
