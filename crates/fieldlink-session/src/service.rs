//! ---
//! fl_section: "05-secure-session"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Publish service start and stop."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_common::TimingConfig;
use fieldlink_logging::{fl_error, fl_info, LogContext};
use fieldlink_modem::is_ok;
use fieldlink_transport::Transactor;

use crate::error::SessionError;

const STARTED_TOKENS: [&str; 3] = ["OK", "+CMQTTSTART: 0", "ALREADY"];

/// Stop any running instance, pause, then start the service.
///
/// A fresh start, a zero status, and "already running" all count as started.
pub fn start_service(engine: &mut Transactor, timing: &TimingConfig) -> Result<(), SessionError> {
    let ctx = LogContext::stage("service");
    stop_service(engine, timing.service_stop_wait);
    engine.pause(timing.service_restart_pause);

    let response = engine.transact("AT+CMQTTSTART", timing.service_start_wait, true);
    if STARTED_TOKENS.iter().any(|token| response.contains(token)) {
        fl_info!(context = ctx, "publish service running");
        Ok(())
    } else {
        fl_error!(context = ctx, "publish service failed to start: {}", response.trim());
        Err(SessionError::ServiceStart {
            response: response.trim().to_owned(),
        })
    }
}

/// Stop the service. Returns whether the modem acknowledged.
pub fn stop_service(engine: &mut Transactor, wait: std::time::Duration) -> bool {
    is_ok(&engine.transact("AT+CMQTTSTOP", wait, true))
}
