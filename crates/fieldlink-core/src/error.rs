//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Stage-fatal bring-up failures."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_modem::RegistrationError;
use fieldlink_session::{ConnectError, SessionError};
use thiserror::Error;

/// A failure that stops bring-up and sends the gateway into the halt loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BringUpError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// Only raised in strict mode.
    #[error("connectivity probe failed: {response}")]
    DataProbe { response: String },
    /// Only raised in strict mode.
    #[error("{degraded} TLS configuration command(s) not acknowledged")]
    TlsIncomplete { degraded: usize },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl BringUpError {
    /// Short stage label for the status display and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Registration(_) => "registration",
            Self::DataProbe { .. } => "data",
            Self::TlsIncomplete { .. } => "tls",
            Self::Session(SessionError::ServiceStart { .. }) => "service",
            Self::Session(SessionError::AcquireRejected { .. }) => "acquire",
            Self::Connect(_) => "connect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels_follow_the_failing_step() {
        let err = BringUpError::from(RegistrationError::Exhausted { attempts: 20 });
        assert_eq!(err.stage(), "registration");
        let err = BringUpError::from(SessionError::AcquireRejected {
            slot: 0,
            response: "ERROR".into(),
        });
        assert_eq!(err.stage(), "acquire");
        assert_eq!(BringUpError::TlsIncomplete { degraded: 2 }.stage(), "tls");
    }
}
