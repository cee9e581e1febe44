//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Packet data context activation."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_common::{NetworkConfig, TimingConfig};
use fieldlink_logging::{fl_info, fl_warn, LogContext};
use fieldlink_transport::Transactor;

use crate::StepOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReport {
    pub probe: StepOutcome,
    pub probe_response: String,
}

/// Define, attach, and activate the data context, then probe connectivity.
///
/// The three setup commands are not checked. A failed probe is reported as
/// [`StepOutcome::Degraded`]; this function never fails.
pub fn activate_data_context(
    engine: &mut Transactor,
    network: &NetworkConfig,
    timing: &TimingConfig,
) -> DataReport {
    let ctx = LogContext::stage("data");
    let cid = network.pdp_context;

    engine.transact(
        &format!("AT+CGDCONT={},\"IP\",\"{}\"", cid, network.apn),
        timing.pdp_define_wait,
        true,
    );
    engine.transact("AT+CGATT=1", timing.attach_wait, true);
    engine.pause(timing.attach_pause);
    engine.transact(&format!("AT+CGACT=1,{cid}"), timing.activate_wait, true);
    engine.pause(timing.activate_pause);

    let probe_response = engine.transact(
        &format!("AT+CPING=\"{}\",1,2", network.probe_host),
        timing.probe_wait,
        true,
    );
    let reached = network
        .probe_ok_codes
        .iter()
        .any(|code| probe_response.contains(code.as_str()));
    if reached {
        fl_info!(context = ctx, "data path reached {}", network.probe_host);
    } else {
        fl_warn!(
            context = ctx,
            "connectivity probe to {} not confirmed, continuing",
            network.probe_host
        );
    }
    DataReport {
        probe: StepOutcome::from_confirmed(reached),
        probe_response,
    }
}
