//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Bring-up sequencing, publish run loop, and halt transitions."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use fieldlink_common::time::format_elapsed;
use fieldlink_common::{
    AppConfig, BlinkPattern, DeviceIdentity, Feedback, SharedClock, TelemetryRecord,
    TelemetrySource,
};
use fieldlink_logging::{fl_info, fl_warn, log_stage_event, LogContext, StageOutcome};
use fieldlink_metrics::GatewayMetrics;
use fieldlink_modem::{
    activate_data_context, await_registration, handshake, power_control_from_config, power_on,
    provision, ArtifactSet, PowerControl,
};
use fieldlink_rt::{Heartbeat, IntervalGate, StopSignal};
use fieldlink_session::{configure_tls, start_service, SessionManager, TeardownReport};
use fieldlink_transport::Transactor;
use tracing::{debug, error, info};

use crate::error::BringUpError;
use crate::state::{GatewayState, PeripheralState};

const TITLE: &str = "FieldLink";

/// Owns the transaction engine and every collaborator the bring-up touches.
pub struct Gateway {
    config: Arc<AppConfig>,
    engine: Transactor,
    clock: SharedClock,
    identity: DeviceIdentity,
    artifacts: Option<ArtifactSet>,
    session: SessionManager,
    feedback: Feedback,
    power: Box<dyn PowerControl>,
    telemetry: Box<dyn TelemetrySource>,
    metrics: Option<GatewayMetrics>,
    stop: StopSignal,
    state: GatewayState,
    peripheral: PeripheralState,
    gate: IntervalGate,
    heartbeat: Heartbeat,
}

impl Gateway {
    /// Derive the device identity and load the TLS artifacts named in `config`.
    ///
    /// Unusable artifacts are not an error here; provisioning reports them and
    /// the gateway continues without TLS material.
    pub fn new(
        config: AppConfig,
        engine: Transactor,
        telemetry: Box<dyn TelemetrySource>,
    ) -> Result<Self> {
        let identity = DeviceIdentity::from_config(&config.device)
            .context("failed to derive device identity")?;
        let artifacts = if config.tls.enabled {
            match ArtifactSet::from_config(&config.tls) {
                Ok(set) => Some(set),
                Err(err) => {
                    fl_warn!(
                        context = LogContext::stage("provisioning"),
                        "artifacts unavailable: {}",
                        err
                    );
                    None
                }
            }
        } else {
            None
        };
        let tls_context = config.tls.enabled.then_some(config.tls.context);
        let session =
            SessionManager::new(&config.broker, tls_context, identity.as_str(), &config.timing);
        let clock = Arc::clone(engine.clock());
        let gate = IntervalGate::new(config.schedule.publish_interval, clock.now());
        let heartbeat = Heartbeat::new(config.schedule.heartbeat_on, config.schedule.heartbeat_off);
        let power = power_control_from_config(&config.modem.power);

        Ok(Self {
            config: Arc::new(config),
            engine,
            clock,
            identity,
            artifacts,
            session,
            feedback: Feedback::silent(),
            power,
            telemetry,
            metrics: None,
            stop: StopSignal::new(),
            state: GatewayState::default(),
            peripheral: PeripheralState::Off,
            gate,
            heartbeat,
        })
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_power(mut self, power: Box<dyn PowerControl>) -> Self {
        self.power = power;
        self
    }

    pub fn with_metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Replace the artifacts loaded from `[tls]`.
    pub fn with_artifacts(mut self, artifacts: ArtifactSet) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Furthest bring-up stage reached.
    pub fn peripheral(&self) -> PeripheralState {
        self.peripheral
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Bring the modem up, then run until stopped or halted. Returns the final state.
    pub fn run(&mut self) -> &GatewayState {
        match self.bring_up() {
            Ok(()) => while self.step() {},
            Err(err) => self.halt(err),
        }
        &self.state
    }

    /// Power, register, attach, provision, start the service, acquire, connect.
    ///
    /// Leaves the gateway in [`GatewayState::Running`] on success. Registration,
    /// service start, acquisition, and connect failures are fatal; the data
    /// probe and TLS configuration are fatal only in strict mode.
    pub fn bring_up(&mut self) -> Result<(), BringUpError> {
        let config = Arc::clone(&self.config);
        let timing = &config.timing;
        let clock = Arc::clone(&self.clock);
        let started = clock.now();

        self.feedback.show(&[TITLE, "1.Power", "booting"]);
        clock.sleep(timing.boot_stabilize);
        let warmup = self.telemetry.read();
        debug!(?warmup, "sensor warm-up reading");

        power_on(self.power.as_mut(), clock.as_ref(), timing);
        clock.sleep(timing.post_power_pause);
        handshake(&mut self.engine, timing);
        self.advance(PeripheralState::PoweredOn);
        self.record("power", StageOutcome::Success, "modem powered");

        let registration =
            match await_registration(&mut self.engine, &config.network, timing, &self.feedback) {
                Ok(report) => report,
                Err(err) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.set_registration_attempts(config.network.registration_attempts);
                    }
                    return Err(self.fault(err.into()));
                }
            };
        if let Some(metrics) = &self.metrics {
            metrics.set_registration_attempts(registration.attempts);
        }
        self.advance(PeripheralState::Registered);
        self.record(
            "registration",
            StageOutcome::Success,
            &format!("registered after {} attempt(s)", registration.attempts),
        );
        clock.sleep(timing.stage_pause);

        self.feedback.show(&[TITLE, "2.Data", "activating"]);
        let data = activate_data_context(&mut self.engine, &config.network, timing);
        if data.probe.is_confirmed() {
            self.record("data", StageOutcome::Success, "connectivity probe answered");
        } else if config.strict {
            return Err(self.fault(BringUpError::DataProbe {
                response: data.probe_response.trim().to_owned(),
            }));
        } else {
            self.record("data", StageOutcome::Degraded, "connectivity probe not confirmed");
        }
        self.advance(PeripheralState::DataAttached);
        clock.sleep(timing.stage_pause);

        if self.provision_artifacts() {
            self.advance(PeripheralState::CertificatesLoaded);
            let report = configure_tls(&mut self.engine, &config.tls, timing);
            if report.all_confirmed() {
                self.record("tls", StageOutcome::Success, "TLS context configured");
            } else if config.strict {
                return Err(self.fault(BringUpError::TlsIncomplete {
                    degraded: report.degraded(),
                }));
            } else {
                self.record(
                    "tls",
                    StageOutcome::Degraded,
                    &format!("{} configuration command(s) unconfirmed", report.degraded()),
                );
            }
            self.advance(PeripheralState::TlsConfigured);
            clock.sleep(timing.stage_pause);
        }

        self.feedback.show(&[TITLE, "4.MQTT", "starting"]);
        start_service(&mut self.engine, timing).map_err(|err| self.fault(err.into()))?;
        self.advance(PeripheralState::ServiceRunning);
        self.record("service", StageOutcome::Success, "publish service running");

        self.session
            .acquire(&mut self.engine)
            .map_err(|err| self.fault(err.into()))?;
        self.advance(PeripheralState::SessionAcquired);
        self.record("acquire", StageOutcome::Success, "session handle acquired");

        self.feedback.show(&[TITLE, "4.MQTT", "connecting"]);
        let path = self
            .session
            .connect(&mut self.engine, &self.feedback)
            .map_err(|err| self.fault(err.into()))?;
        self.advance(PeripheralState::SessionConnected);
        self.record("connect", StageOutcome::Success, &format!("connected ({path:?})"));

        let elapsed = clock.now().saturating_duration_since(started);
        let took = format_elapsed(elapsed);
        info!(
            device_id = %self.identity,
            broker = %config.broker.url(),
            took = %took,
            "bring-up complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.observe_bringup(elapsed.as_secs_f64());
            metrics.set_publish_counter(self.session.counter());
        }
        let took_line = format!("in {took}");
        self.feedback.show(&[TITLE, "ONLINE", took_line.as_str()]);
        self.feedback.blink(BlinkPattern::Success, clock.as_ref());

        self.gate = IntervalGate::new(config.schedule.publish_interval, clock.now());
        self.state = GatewayState::Running;
        Ok(())
    }

    /// One run loop iteration: stop check, scheduled publish, heartbeat.
    ///
    /// Returns `false` once the loop must end. A stop request tears the
    /// session down before returning.
    pub fn step(&mut self) -> bool {
        if self.state != GatewayState::Running {
            return false;
        }
        if self.stop.is_triggered() {
            self.shutdown();
            return false;
        }
        if self.gate.is_due(self.clock.now()) {
            self.publish_telemetry();
            self.gate.mark(self.clock.now());
        }
        self.heartbeat
            .beat(self.feedback.indicator(), self.clock.as_ref());
        true
    }

    /// Disconnect, release, and stop the service. Never fails.
    pub fn shutdown(&mut self) -> TeardownReport {
        info!("stop requested, tearing down session");
        self.feedback.show(&[TITLE, "stopping"]);
        let report = self.session.teardown(&mut self.engine);
        self.feedback.light(false);
        self.state = GatewayState::Stopped;
        report
    }

    fn publish_telemetry(&mut self) {
        let reading = self.telemetry.read();
        let sequence = self.session.counter();
        let payload =
            TelemetryRecord::from_reading(self.identity.as_str(), sequence, &reading).to_payload();
        let climate = format!(
            "T:{}C H:{}%",
            one_decimal(reading.temperature),
            one_decimal(reading.humidity)
        );
        let gas = format!("PPM:{}", one_decimal(reading.ppm));
        let pending = format!(">>> #{sequence}");
        self.feedback
            .show(&[climate.as_str(), gas.as_str(), pending.as_str()]);

        let result = self.session.publish(
            &mut self.engine,
            &self.config.broker.topic,
            payload.as_bytes(),
            &self.feedback,
        );
        let outcome = match result {
            Ok(sent) => {
                debug!(sequence = sent, %payload, "telemetry published");
                format!("Msg #{sent}")
            }
            Err(err) => {
                fl_warn!(
                    context = LogContext::stage("publish"),
                    "publish #{} failed: {}",
                    sequence,
                    err
                );
                "send failed".to_owned()
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_publish(self.session.counter() > sequence);
            metrics.set_publish_counter(self.session.counter());
        }
        self.feedback
            .show(&[climate.as_str(), gas.as_str(), outcome.as_str()]);
    }

    /// Returns whether all three artifacts were stored on the modem.
    fn provision_artifacts(&mut self) -> bool {
        if !self.config.tls.enabled {
            fl_info!(
                context = LogContext::stage("provisioning"),
                "TLS disabled, skipping certificates"
            );
            return false;
        }
        let Some(artifacts) = self.artifacts.as_ref() else {
            self.record("provisioning", StageOutcome::Degraded, "no usable artifacts");
            return false;
        };
        let report = provision(
            &mut self.engine,
            artifacts,
            &self.config.tls.placeholder_marker,
            &self.config.timing,
            &self.feedback,
        );
        if report.all_succeeded() {
            self.record("provisioning", StageOutcome::Success, "all artifacts stored");
            true
        } else {
            self.record(
                "provisioning",
                StageOutcome::Degraded,
                &format!(
                    "{}/{} artifacts stored, skipping TLS configuration",
                    report.succeeded(),
                    artifacts.records().len()
                ),
            );
            false
        }
    }

    fn halt(&mut self, err: BringUpError) {
        error!(error = %err, stage = err.stage(), "bring-up failed");
        let stage = err.stage();
        self.state = GatewayState::Halted(err);
        fieldlink_rt::halt(
            &self.feedback,
            self.clock.as_ref(),
            self.config.schedule.halt_pause,
            &self.stop,
            stage,
        );
    }

    fn advance(&mut self, next: PeripheralState) {
        debug!(from = %self.peripheral, to = %next, "peripheral state advanced");
        self.peripheral = next;
        self.state = GatewayState::BringUp(next);
    }

    fn record(&self, stage: &str, outcome: StageOutcome, message: &str) {
        log_stage_event(Some(&LogContext::stage(stage)), stage, message, outcome);
        if let Some(metrics) = &self.metrics {
            metrics.record_stage(stage, outcome.as_str());
        }
    }

    fn fault(&self, err: BringUpError) -> BringUpError {
        self.record(err.stage(), StageOutcome::Fault, &err.to_string());
        err
    }
}

fn one_decimal(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_owned(), |value| format!("{value:.1}"))
}
