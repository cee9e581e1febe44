//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Two-phase artifact upload into the modem store."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_common::{Feedback, TimingConfig};
use fieldlink_logging::{fl_error, fl_info, fl_warn, LogContext};
use fieldlink_transport::{PollOutcome, Transactor, PROMPT};

use crate::artifact::{ArtifactRecord, ArtifactRole, ArtifactSet};
use crate::error::{ArtifactError, UploadError};

const ACK: &str = "OK";
const REJECT: &str = "ERROR";

/// Outcome of provisioning all three artifacts.
#[derive(Debug)]
pub struct ProvisioningReport {
    /// Set when validation stopped provisioning before any upload.
    pub blocked: Option<ArtifactError>,
    pub uploads: Vec<(ArtifactRole, Result<(), UploadError>)>,
}

impl ProvisioningReport {
    /// True only when every artifact was uploaded and acknowledged.
    pub fn all_succeeded(&self) -> bool {
        self.blocked.is_none()
            && self.uploads.len() == ArtifactRole::ALL.len()
            && self.uploads.iter().all(|(_, result)| result.is_ok())
    }

    pub fn succeeded(&self) -> usize {
        self.uploads.iter().filter(|(_, result)| result.is_ok()).count()
    }
}

/// Announce, wait for the prompt, stream the bytes, wait for the acknowledgment.
///
/// No artifact bytes are written unless the prompt was seen.
pub fn upload_artifact(
    engine: &mut Transactor,
    record: &ArtifactRecord,
    timing: &TimingConfig,
) -> Result<(), UploadError> {
    let name = record.name().to_owned();
    let announce = format!("AT+CCERTDOWN=\"{}\",{}", record.name(), record.len());
    let ctx = LogContext::stage("provisioning").with_command(&announce);

    engine.pause(timing.artifact_drain_pause);
    engine.drain();
    if !engine.send_line(&announce) {
        return Err(UploadError::WriteFailed { name });
    }

    match engine.poll_for(
        &[PROMPT],
        &[REJECT],
        timing.artifact_prompt_budget,
        timing.artifact_poll_slice,
    ) {
        PollOutcome::Matched(_) => {}
        PollOutcome::Rejected(_) => {
            return Err(UploadError::Rejected {
                name,
                phase: "announce",
            })
        }
        PollOutcome::TimedOut(_) => return Err(UploadError::PromptTimeout { name }),
    }

    fl_info!(context = ctx, "prompt received, writing {} bytes", record.len());
    if !engine.write_raw(record.content()) {
        return Err(UploadError::WriteFailed { name });
    }
    engine.pause(timing.artifact_write_settle);

    match engine.poll_for(
        &[ACK],
        &[REJECT],
        timing.artifact_ack_budget,
        timing.artifact_poll_slice,
    ) {
        PollOutcome::Matched(_) => Ok(()),
        PollOutcome::Rejected(_) => Err(UploadError::Rejected {
            name,
            phase: "payload",
        }),
        PollOutcome::TimedOut(_) => Err(UploadError::AckTimeout { name }),
    }
}

/// Upload trust anchor, device certificate, and device key in that order.
///
/// Every upload is attempted even when an earlier one fails.
pub fn provision(
    engine: &mut Transactor,
    artifacts: &ArtifactSet,
    placeholder_marker: &str,
    timing: &TimingConfig,
    feedback: &Feedback,
) -> ProvisioningReport {
    let ctx = LogContext::stage("provisioning");
    if let Err(err) = artifacts.validate(placeholder_marker) {
        fl_error!(context = ctx, "artifacts not usable: {}", err);
        return ProvisioningReport {
            blocked: Some(err),
            uploads: Vec::new(),
        };
    }

    let total = artifacts.records().len();
    let mut uploads = Vec::with_capacity(total);
    for (index, record) in artifacts.records().iter().enumerate() {
        let step = format!("{}/{} {}", index + 1, total, record.name());
        feedback.show(&["FieldLink", "3.Certificates", step.as_str()]);

        let result = upload_artifact(engine, record, timing);
        match &result {
            Ok(()) => fl_info!(context = ctx, "{} stored as {}", record.role(), record.name()),
            Err(err) => fl_warn!(context = ctx, "{} upload failed: {}", record.role(), err),
        }
        uploads.push((record.role(), result));
        engine.pause(timing.artifact_gap);
    }

    let report = ProvisioningReport {
        blocked: None,
        uploads,
    };
    fl_info!(
        context = ctx,
        "{}/{} artifacts provisioned",
        report.succeeded(),
        total
    );
    report
}
