//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Network registration polling and signal report."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use fieldlink_common::{BlinkPattern, Feedback, NetworkConfig, TimingConfig};
use fieldlink_logging::{fl_debug, fl_info, fl_warn, LogContext};
use fieldlink_transport::Transactor;

use crate::error::RegistrationError;

/// Received signal strength as reported by `AT+CSQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    pub rssi: u8,
    pub ber: u8,
}

impl SignalQuality {
    /// Parse the first `+CSQ: <rssi>,<ber>` line in `response`.
    pub fn parse(response: &str) -> Option<Self> {
        let start = response.find("+CSQ:")? + "+CSQ:".len();
        let line = response[start..].lines().next()?;
        let mut fields = line.split(',').map(str::trim);
        let rssi = fields.next()?.parse().ok()?;
        let ber = fields.next()?.parse().ok()?;
        Some(Self { rssi, ber })
    }

    /// Signal level in dBm, `None` when the modem reports it as unknown.
    pub fn dbm(&self) -> Option<i32> {
        match self.rssi {
            99 => None,
            rssi => Some(-113 + 2 * i32::from(rssi)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Number of registration queries issued, including the successful one.
    pub attempts: u32,
    pub signal: Option<SignalQuality>,
}

/// Poll the registration status up to `registration_attempts` times.
pub fn await_registration(
    engine: &mut Transactor,
    network: &NetworkConfig,
    timing: &TimingConfig,
    feedback: &Feedback,
) -> Result<RegistrationReport, RegistrationError> {
    let limit = network.registration_attempts;
    for attempt in 1..=limit {
        let ctx = LogContext::stage("registration").with_attempt(attempt);
        let progress = format!("try {attempt}/{limit}");
        feedback.show(&["FieldLink", "2.Network", progress.as_str()]);

        let response = engine.transact("AT+CREG?", timing.registration_query_wait, true);
        if network
            .registered_codes
            .iter()
            .any(|code| response.contains(code.as_str()))
        {
            fl_info!(context = ctx, "registered on attempt {}/{}", attempt, limit);
            let signal = report_signal(engine, timing);
            feedback.show(&["FieldLink", "2.Network", "registered"]);
            feedback.blink(BlinkPattern::Success, engine.clock().as_ref());
            return Ok(RegistrationReport {
                attempts: attempt,
                signal,
            });
        }

        fl_debug!(context = ctx, "not registered yet: {}", response.trim());
        feedback.blink(BlinkPattern::Connecting, engine.clock().as_ref());
        engine.pause(timing.registration_retry_delay);
    }

    fl_warn!(
        context = LogContext::stage("registration"),
        "registration not confirmed after {} attempts",
        limit
    );
    Err(RegistrationError::Exhausted { attempts: limit })
}

fn report_signal(engine: &mut Transactor, timing: &TimingConfig) -> Option<SignalQuality> {
    let ctx = LogContext::stage("registration").with_command("AT+CSQ");
    let response = engine.transact("AT+CSQ", timing.signal_query_wait, true);
    let signal = SignalQuality::parse(&response);
    match signal.and_then(|quality| quality.dbm()) {
        Some(dbm) => fl_info!(context = ctx, "signal {} dBm", dbm),
        None => fl_info!(context = ctx, "signal level unknown"),
    }
    signal
}
