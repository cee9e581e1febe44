//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Peripheral and gateway lifecycle states."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fmt;

use crate::error::BringUpError;

/// How far the modem has been brought up. Only ever moves forward.
///
/// Certificate and TLS states are skipped when provisioning did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PeripheralState {
    #[default]
    Off,
    PoweredOn,
    Registered,
    DataAttached,
    CertificatesLoaded,
    TlsConfigured,
    ServiceRunning,
    SessionAcquired,
    SessionConnected,
}

impl PeripheralState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::PoweredOn => "powered-on",
            Self::Registered => "registered",
            Self::DataAttached => "data-attached",
            Self::CertificatesLoaded => "certificates-loaded",
            Self::TlsConfigured => "tls-configured",
            Self::ServiceRunning => "service-running",
            Self::SessionAcquired => "session-acquired",
            Self::SessionConnected => "session-connected",
        }
    }
}

impl fmt::Display for PeripheralState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the whole gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    BringUp(PeripheralState),
    /// Session connected; the run loop is publishing.
    Running,
    /// Terminal. Left only by stopping the process.
    Halted(BringUpError),
    /// Torn down after a stop request.
    Stopped,
}

impl GatewayState {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::BringUp(PeripheralState::Off)
    }
}
