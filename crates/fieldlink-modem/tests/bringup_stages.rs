//! ---
//! fl_section: "15-testing"
//! fl_subsection: "integration"
//! fl_type: "test"
//! fl_scope: "code"
//! fl_description: "Registration and data context stages against the scripted peripheral."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use fieldlink_common::{Feedback, NetworkConfig, TimingConfig};
use fieldlink_modem::{
    activate_data_context, await_registration, handshake, RegistrationError, StepOutcome,
};
use fieldlink_testharness::{FakeClock, RecordingDisplay, RecordingIndicator, Reply, SimulatedModem};
use fieldlink_transport::Transactor;

struct Bench {
    engine: Transactor,
    modem: SimulatedModem,
    clock: Arc<FakeClock>,
    display: Arc<RecordingDisplay>,
    feedback: Feedback,
}

fn bench() -> Bench {
    let clock = FakeClock::new();
    let modem = SimulatedModem::new(clock.clone());
    let engine = Transactor::new(Box::new(modem.clone()), clock.clone());
    let display = Arc::new(RecordingDisplay::new());
    let feedback = Feedback::new(Arc::new(RecordingIndicator::new(clock.clone())), display.clone());
    Bench {
        engine,
        modem,
        clock,
        display,
        feedback,
    }
}

fn searching() -> Reply {
    Reply::text("\r\n+CREG: 0,2\r\n\r\nOK\r\n")
}

#[test]
fn registration_stops_at_first_accepted_status() {
    let mut b = bench();
    b.modem.respond_seq(
        "AT+CREG",
        vec![searching(), searching(), Reply::text("\r\n+CREG: 0,5\r\n\r\nOK\r\n")],
    );
    b.modem.respond("AT+CSQ", Reply::text("\r\n+CSQ: 20,99\r\n\r\nOK\r\n"));

    let report = await_registration(
        &mut b.engine,
        &NetworkConfig::default(),
        &TimingConfig::default(),
        &b.feedback,
    )
    .unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(report.signal.and_then(|s| s.dbm()), Some(-73));
    assert_eq!(b.modem.count("AT+CREG?"), 3);
    assert!(b.display.showed("try 3/20"));
}

#[test]
fn registration_gives_up_after_exactly_the_bound() {
    let mut b = bench();
    b.modem.respond("AT+CREG", searching());
    let network = NetworkConfig {
        registration_attempts: 7,
        ..NetworkConfig::default()
    };

    let err = await_registration(&mut b.engine, &network, &TimingConfig::default(), &b.feedback)
        .unwrap_err();

    assert_eq!(err, RegistrationError::Exhausted { attempts: 7 });
    assert_eq!(b.modem.count("AT+CREG?"), 7);
    assert_eq!(b.modem.count("AT+CSQ"), 0);
}

#[test]
fn roaming_status_counts_as_registered() {
    let mut b = bench();
    b.modem.respond("AT+CREG", Reply::text("+CREG: 0,5"));
    let report = await_registration(
        &mut b.engine,
        &NetworkConfig::default(),
        &TimingConfig::immediate(),
        &b.feedback,
    )
    .unwrap();
    assert_eq!(report.attempts, 1);
}

#[test]
fn data_context_commands_are_issued_even_when_probe_fails() {
    let mut b = bench();
    b.modem.respond("AT+CGATT", Reply::error());
    b.modem.respond("AT+CPING", Reply::text("\r\nOK\r\n\r\n+CPING: 2,0,0\r\n"));
    let start = b.clock.elapsed();

    let report = activate_data_context(&mut b.engine, &NetworkConfig::default(), &TimingConfig::default());

    assert_eq!(report.probe, StepOutcome::Degraded);
    assert_eq!(
        b.modem.commands(),
        vec![
            "AT+CGDCONT=1,\"IP\",\"internet\"",
            "AT+CGATT=1",
            "AT+CGACT=1,1",
            "AT+CPING=\"8.8.8.8\",1,2",
        ]
    );
    assert_eq!(b.clock.elapsed() - start, Duration::from_millis(15_500));
}

#[test]
fn probe_reply_confirms_data_path() {
    let mut b = bench();
    b.modem.respond("AT+CPING", Reply::text("\r\nOK\r\n\r\n+CPING: 1,8.8.8.8,64,52,255\r\n"));
    let report = activate_data_context(&mut b.engine, &NetworkConfig::default(), &TimingConfig::immediate());
    assert!(report.probe.is_confirmed());
}

#[test]
fn handshake_disables_echo() {
    let mut b = bench();
    assert!(handshake(&mut b.engine, &TimingConfig::immediate()));
    assert_eq!(b.modem.commands(), vec!["AT", "ATE0"]);

    b.modem.fallback(Reply::silent());
    assert!(!handshake(&mut b.engine, &TimingConfig::immediate()));
}
