//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Modem bring-up stages and artifact provisioning."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
//! Stages that take the modem from powered-off to an attached data context,
//! plus the certificate upload protocol.
//!
//! Stages return typed results; deciding whether a failure halts the device is
//! left to the caller.

pub mod artifact;
pub mod data;
pub mod error;
pub mod power;
pub mod provisioning;
pub mod registration;

pub use artifact::{ArtifactRecord, ArtifactRole, ArtifactSet};
pub use data::{activate_data_context, DataReport};
pub use error::{ArtifactError, RegistrationError, UploadError};
pub use power::{
    handshake, power_control_from_config, power_on, NoPowerControl, PowerControl, PowerLine,
    SysfsGpioPower,
};
pub use provisioning::{provision, upload_artifact, ProvisioningReport};
pub use registration::{await_registration, RegistrationReport, SignalQuality};

/// Result of a best-effort step that never fails its stage on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The peripheral confirmed the step.
    Confirmed,
    /// No confirmation was seen; the stage carried on regardless.
    Degraded,
}

impl StepOutcome {
    pub fn from_confirmed(confirmed: bool) -> Self {
        if confirmed {
            StepOutcome::Confirmed
        } else {
            StepOutcome::Degraded
        }
    }

    pub fn is_confirmed(self) -> bool {
        self == StepOutcome::Confirmed
    }
}

/// True when `response` carries a generic success token.
pub fn is_ok(response: &str) -> bool {
    response.contains("OK")
}
