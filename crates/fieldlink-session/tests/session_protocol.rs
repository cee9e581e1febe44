//! ---
//! fl_section: "15-testing"
//! fl_subsection: "integration"
//! fl_type: "test"
//! fl_scope: "code"
//! fl_description: "Session manager protocol behaviour against the scripted peripheral."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use fieldlink_common::{BrokerConfig, Feedback, TimingConfig, TlsConfig};
use fieldlink_session::{
    configure_tls, start_service, ConnectError, ConnectPath, PublishError, SessionError,
    SessionManager,
};
use fieldlink_testharness::{FakeClock, RecordingDisplay, RecordingIndicator, Reply, SimulatedModem};
use fieldlink_transport::Transactor;

struct Bench {
    engine: Transactor,
    modem: SimulatedModem,
    clock: Arc<FakeClock>,
    display: Arc<RecordingDisplay>,
    indicator: Arc<RecordingIndicator>,
    feedback: Feedback,
    session: SessionManager,
}

fn broker() -> BrokerConfig {
    BrokerConfig {
        endpoint: "broker.example.net".into(),
        topic: "sensors".into(),
        ..BrokerConfig::default()
    }
}

fn bench() -> Bench {
    let clock = FakeClock::new();
    let modem = SimulatedModem::new(clock.clone());
    let engine = Transactor::new(Box::new(modem.clone()), clock.clone());
    let display = Arc::new(RecordingDisplay::new());
    let indicator = Arc::new(RecordingIndicator::new(clock.clone()));
    let feedback = Feedback::new(indicator.clone(), display.clone());
    let session = SessionManager::new(&broker(), Some(0), "FIELDLINK_ab12", &TimingConfig::default());
    Bench {
        engine,
        modem,
        clock,
        display,
        indicator,
        feedback,
        session,
    }
}

fn script_publish_prompts(modem: &SimulatedModem) {
    modem.respond("AT+CMQTTTOPIC", Reply::prompt_then(Reply::ok()));
    modem.respond("AT+CMQTTPAYLOAD", Reply::prompt_then(Reply::ok()));
    modem.respond("AT+CMQTTPUB", Reply::ok().then_after(Duration::from_millis(300), "\r\n+CMQTTPUB: 0,0\r\n"));
}

#[test]
fn tls_configuration_sends_all_five_commands_even_when_rejected() {
    let mut b = bench();
    b.modem.fallback(Reply::error());

    let report = configure_tls(&mut b.engine, &TlsConfig::default(), &TimingConfig::default());

    assert_eq!(report.steps.len(), 5);
    assert_eq!(report.degraded(), 5);
    assert_eq!(
        b.modem.commands(),
        vec![
            "AT+CSSLCFG=\"sslversion\",0,3",
            "AT+CSSLCFG=\"authmode\",0,2",
            "AT+CSSLCFG=\"cacert\",0,\"cacert.pem\"",
            "AT+CSSLCFG=\"clientcert\",0,\"clientcert.pem\"",
            "AT+CSSLCFG=\"clientkey\",0,\"clientkey.pem\"",
        ]
    );
}

#[test]
fn service_start_accepts_already_running() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTSTOP", Reply::error());
    b.modem.respond("AT+CMQTTSTART", Reply::text("\r\nALREADY\r\n"));
    start_service(&mut b.engine, &TimingConfig::default()).unwrap();
    assert_eq!(b.modem.commands(), vec!["AT+CMQTTSTOP", "AT+CMQTTSTART"]);
}

#[test]
fn service_start_accepts_zero_status() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTSTART", Reply::text("\r\n+CMQTTSTART: 0\r\n"));
    assert!(start_service(&mut b.engine, &TimingConfig::immediate()).is_ok());
}

#[test]
fn service_start_failure_is_reported() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTSTART", Reply::text("\r\n+CMQTTSTART: 23\r\nERROR\r\n"));
    let err = start_service(&mut b.engine, &TimingConfig::immediate()).unwrap_err();
    assert!(matches!(err, SessionError::ServiceStart { .. }));
}

#[test]
fn acquire_releases_stale_handle_first() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTREL", Reply::error());
    b.session.acquire(&mut b.engine).unwrap();
    assert_eq!(
        b.modem.commands(),
        vec!["AT+CMQTTREL=0", "AT+CMQTTACCQ=0,\"FIELDLINK_ab12\",1"]
    );
}

#[test]
fn acquire_requires_acknowledgment() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTACCQ", Reply::error());
    assert!(matches!(
        b.session.acquire(&mut b.engine),
        Err(SessionError::AcquireRejected { slot: 0, .. })
    ));
}

#[test]
fn connect_succeeds_synchronously_on_zero_status() {
    let mut b = bench();
    b.modem.respond(
        "AT+CMQTTCONNECT",
        Reply::ok().then_after(Duration::from_secs(1), "\r\n+CMQTTCONNECT: 0,0\r\n"),
    );
    let start = b.clock.elapsed();

    let path = b.session.connect(&mut b.engine, &b.feedback).unwrap();

    assert_eq!(path, ConnectPath::Synchronous);
    assert_eq!(
        b.modem.commands(),
        vec![
            "AT+CMQTTSSLCFG=0,0",
            "AT+CMQTTCONNECT=0,\"tcp://broker.example.net:8883\",60,1",
        ]
    );
    assert_eq!(b.clock.elapsed() - start, Duration::from_secs(6));
}

#[test]
fn connect_rejects_nonzero_synchronous_status() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTCONNECT", Reply::text("\r\nOK\r\n\r\n+CMQTTCONNECT: 0,32\r\n"));
    let err = b.session.connect(&mut b.engine, &b.feedback).unwrap_err();
    assert_eq!(err, ConnectError::Refused { status: "0,32".into() });
}

#[test]
fn connect_waits_for_delayed_asynchronous_status() {
    let mut b = bench();
    b.modem.respond(
        "AT+CMQTTCONNECT",
        Reply::ok().then_after(Duration::from_secs(20), "\r\n+CMQTTCONNECT: 0,0\r\n"),
    );

    let path = b.session.connect(&mut b.engine, &b.feedback).unwrap();

    assert_eq!(path, ConnectPath::Asynchronous { waited: Duration::from_secs(17) });
    assert!(b.display.showed("wait 10s"));
    assert!(!b.display.showed("wait 20s"));
}

#[test]
fn connect_handles_status_split_across_reads() {
    let mut b = bench();
    b.modem.respond(
        "AT+CMQTTCONNECT",
        Reply::ok()
            .then_after(Duration::from_secs(5), "\r\n+CMQTTCONN")
            .then_after(Duration::from_secs(6), "ECT: 0,0\r\n"),
    );
    assert!(b.session.connect(&mut b.engine, &b.feedback).is_ok());
}

#[test]
fn connect_rejects_delayed_nonzero_status() {
    let mut b = bench();
    b.modem.respond(
        "AT+CMQTTCONNECT",
        Reply::ok().then_after(Duration::from_secs(12), "\r\n+CMQTTCONNECT: 0,5\r\n"),
    );
    let err = b.session.connect(&mut b.engine, &b.feedback).unwrap_err();
    assert_eq!(err, ConnectError::Refused { status: "0,5".into() });
}

#[test]
fn connect_times_out_after_asynchronous_budget() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTCONNECT", Reply::ok());
    let start = b.clock.elapsed();

    let err = b.session.connect(&mut b.engine, &b.feedback).unwrap_err();

    assert_eq!(err, ConnectError::TimedOut { waited: Duration::from_secs(35) });
    assert_eq!(b.clock.elapsed() - start, Duration::from_secs(41));
}

#[test]
fn connect_stops_when_context_binding_fails() {
    let mut b = bench();
    b.modem.respond("AT+CMQTTSSLCFG", Reply::error());
    let err = b.session.connect(&mut b.engine, &b.feedback).unwrap_err();
    assert!(matches!(err, ConnectError::ContextRejected { .. }));
    assert_eq!(b.modem.count("AT+CMQTTCONNECT"), 0);
}

#[test]
fn publish_success_advances_counter_and_acknowledges() {
    let mut b = bench();
    script_publish_prompts(&b.modem);
    let payload = br#"{"counter":1}"#;

    let sequence = b.session.publish(&mut b.engine, "sensors", payload, &b.feedback).unwrap();

    assert_eq!(sequence, 1);
    assert_eq!(b.session.counter(), 2);
    assert_eq!(b.modem.raw_writes(), vec![b"sensors".to_vec(), payload.to_vec()]);
    assert_eq!(
        b.modem.commands(),
        vec!["AT+CMQTTTOPIC=0,7", "AT+CMQTTPAYLOAD=0,13", "AT+CMQTTPUB=0,0,60"]
    );
    assert_eq!(b.indicator.flashes(), 1);
}

#[test]
fn missing_topic_prompt_aborts_before_writing() {
    let mut b = bench();
    script_publish_prompts(&b.modem);
    b.modem.respond("AT+CMQTTTOPIC", Reply::error());

    let err = b.session.publish(&mut b.engine, "sensors", b"{}", &b.feedback).unwrap_err();

    assert_eq!(err, PublishError::NoTopicPrompt);
    assert!(b.modem.raw_writes().is_empty());
    assert_eq!(b.modem.count("AT+CMQTTPAYLOAD"), 0);
    assert_eq!(b.session.counter(), 1);
}

#[test]
fn counter_only_moves_on_committed_publish() {
    let mut b = bench();
    script_publish_prompts(&b.modem);
    b.modem.respond_seq(
        "AT+CMQTTPAYLOAD",
        vec![Reply::silent(), Reply::silent(), Reply::prompt_then(Reply::ok())],
    );

    assert_eq!(
        b.session.publish(&mut b.engine, "sensors", b"{}", &b.feedback),
        Err(PublishError::NoPayloadPrompt)
    );
    assert_eq!(
        b.session.publish(&mut b.engine, "sensors", b"{}", &b.feedback),
        Err(PublishError::NoPayloadPrompt)
    );
    assert_eq!(b.session.counter(), 1);

    assert_eq!(b.session.publish(&mut b.engine, "sensors", b"{}", &b.feedback), Ok(1));
    assert_eq!(b.session.counter(), 2);
    assert_eq!(b.indicator.flashes(), 1);
}

#[test]
fn rejected_commit_leaves_counter() {
    let mut b = bench();
    script_publish_prompts(&b.modem);
    b.modem.respond("AT+CMQTTPUB", Reply::error());
    let err = b.session.publish(&mut b.engine, "sensors", b"{}", &b.feedback).unwrap_err();
    assert!(matches!(err, PublishError::CommitRejected { .. }));
    assert_eq!(b.session.counter(), 1);
}

#[test]
fn teardown_runs_every_step_despite_failures() {
    let mut b = bench();
    b.modem.fallback(Reply::error());

    let report = b.session.teardown(&mut b.engine);

    assert!(!report.disconnected && !report.released && !report.stopped);
    assert_eq!(
        b.modem.commands(),
        vec!["AT+CMQTTDISC=0,60", "AT+CMQTTREL=0", "AT+CMQTTSTOP"]
    );
}

#[test]
fn teardown_tolerates_silent_peripheral() {
    let mut b = bench();
    b.modem.fallback(Reply::silent());
    let start = b.clock.elapsed();
    let report = b.session.teardown(&mut b.engine);
    assert_eq!(report, Default::default());
    assert_eq!(b.clock.elapsed() - start, Duration::from_secs(7));
}
