//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Bring-up and provisioning error types."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::ArtifactRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("network registration not confirmed after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Why a single artifact upload stopped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("{name}: no byte-ready prompt within the wait budget")]
    PromptTimeout { name: String },
    #[error("{name}: peripheral answered ERROR during {phase}")]
    Rejected { name: String, phase: &'static str },
    #[error("{name}: no acknowledgment after the payload")]
    AckTimeout { name: String },
    #[error("{name}: serial write failed")]
    WriteFailed { name: String },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{role} path is not configured")]
    NotConfigured { role: ArtifactRole },
    #[error("unable to read {role} from {path}: {source}")]
    Unreadable {
        role: ArtifactRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{role} is empty")]
    Empty { role: ArtifactRole },
    #[error("{role} still contains the placeholder marker")]
    Placeholder { role: ArtifactRole },
}
