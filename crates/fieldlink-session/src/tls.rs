//! ---
//! fl_section: "05-secure-session"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "TLS context configuration."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_common::{TimingConfig, TlsConfig};
use fieldlink_logging::{fl_info, fl_warn, LogContext};
use fieldlink_modem::{is_ok, StepOutcome};
use fieldlink_transport::Transactor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsReport {
    pub steps: Vec<(String, StepOutcome)>,
}

impl TlsReport {
    pub fn all_confirmed(&self) -> bool {
        self.steps.iter().all(|(_, outcome)| outcome.is_confirmed())
    }

    pub fn degraded(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, outcome)| !outcome.is_confirmed())
            .count()
    }
}

/// Protocol version, peer authentication, and the three stored artifact names.
///
/// All five commands are always sent; an unacknowledged one is only reported.
pub fn configure_tls(engine: &mut Transactor, tls: &TlsConfig, timing: &TimingConfig) -> TlsReport {
    let ctx_id = tls.context;
    let commands = [
        format!("AT+CSSLCFG=\"sslversion\",{},{}", ctx_id, tls.ssl_version),
        format!("AT+CSSLCFG=\"authmode\",{},{}", ctx_id, tls.auth_mode),
        format!("AT+CSSLCFG=\"cacert\",{},\"{}\"", ctx_id, tls.ca_cert_name),
        format!("AT+CSSLCFG=\"clientcert\",{},\"{}\"", ctx_id, tls.client_cert_name),
        format!("AT+CSSLCFG=\"clientkey\",{},\"{}\"", ctx_id, tls.client_key_name),
    ];

    let steps: Vec<(String, StepOutcome)> = commands
        .into_iter()
        .map(|command| {
            let response = engine.transact(&command, timing.tls_command_wait, true);
            let outcome = StepOutcome::from_confirmed(is_ok(&response));
            if !outcome.is_confirmed() {
                fl_warn!(
                    context = LogContext::stage("tls").with_command(&command),
                    "not acknowledged: {}",
                    response.trim()
                );
            }
            (command, outcome)
        })
        .collect();

    let report = TlsReport { steps };
    fl_info!(
        context = LogContext::stage("tls"),
        "TLS context {} configured ({} unconfirmed)",
        ctx_id,
        report.degraded()
    );
    report
}
