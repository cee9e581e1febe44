//! ---
//! fl_section: "05-secure-session"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Broker session acquisition, connect, publish, and teardown."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::time::Duration;

use fieldlink_common::{BlinkPattern, BrokerConfig, Feedback, TimingConfig};
use fieldlink_logging::{fl_debug, fl_error, fl_info, fl_warn, LogContext};
use fieldlink_modem::is_ok;
use fieldlink_transport::{PollOutcome, Transactor, PROMPT};

use crate::error::{ConnectError, PublishError, SessionError};
use crate::service::stop_service;

const CONNECT_STATUS: &str = "+CMQTTCONNECT:";

/// How the definitive connect result arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPath {
    /// Inside the synchronous window after the command.
    Synchronous,
    /// After a bare acknowledgment, `waited` into the asynchronous budget.
    Asynchronous { waited: Duration },
}

/// Which teardown steps the modem acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub disconnected: bool,
    pub released: bool,
    pub stopped: bool,
}

/// Owns the session slot and the publish counter.
#[derive(Debug, Clone)]
pub struct SessionManager {
    slot: u8,
    tls_context: Option<u8>,
    client_id: String,
    broker: BrokerConfig,
    timing: TimingConfig,
    counter: u64,
}

impl SessionManager {
    /// `tls_context` is `None` for a plain-TCP session.
    pub fn new(
        broker: &BrokerConfig,
        tls_context: Option<u8>,
        client_id: impl Into<String>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            slot: broker.client_slot,
            tls_context,
            client_id: client_id.into(),
            broker: broker.clone(),
            timing: timing.clone(),
            counter: 1,
        }
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Sequence number of the next message; starts at 1.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Release any stale handle on the slot, then acquire a fresh one.
    pub fn acquire(&mut self, engine: &mut Transactor) -> Result<(), SessionError> {
        let ctx = LogContext::stage("acquire");
        engine.transact(
            &format!("AT+CMQTTREL={}", self.slot),
            self.timing.session_release_wait,
            true,
        );
        engine.pause(self.timing.session_acquire_pause);

        let server_type = u8::from(self.tls_context.is_some());
        let command = format!(
            "AT+CMQTTACCQ={},\"{}\",{}",
            self.slot, self.client_id, server_type
        );
        let response = engine.transact(&command, self.timing.session_acquire_wait, true);
        if is_ok(&response) {
            fl_info!(context = ctx, "slot {} bound to {}", self.slot, self.client_id);
            Ok(())
        } else {
            fl_error!(context = ctx.with_command(&command), "acquire rejected: {}", response.trim());
            Err(SessionError::AcquireRejected {
                slot: self.slot,
                response: response.trim().to_owned(),
            })
        }
    }

    /// Bind the TLS context, then connect to the broker.
    ///
    /// Success is recognised only by a `<slot>,0` connect status. A bare `OK`
    /// switches to polling for the asynchronous status for up to
    /// `connect_async_budget`.
    pub fn connect(
        &mut self,
        engine: &mut Transactor,
        feedback: &Feedback,
    ) -> Result<ConnectPath, ConnectError> {
        let ctx = LogContext::stage("connect");
        if let Some(tls_context) = self.tls_context {
            let response = engine.transact(
                &format!("AT+CMQTTSSLCFG={},{}", self.slot, tls_context),
                self.timing.connect_context_wait,
                true,
            );
            if !is_ok(&response) {
                fl_error!(context = ctx, "TLS context not bound: {}", response.trim());
                return Err(ConnectError::ContextRejected {
                    response: response.trim().to_owned(),
                });
            }
        }

        let command = format!(
            "AT+CMQTTCONNECT={},\"{}\",{},{}",
            self.slot,
            self.broker.url(),
            self.broker.keepalive_secs,
            u8::from(self.broker.clean_session)
        );
        let success = format!("{} {},0", CONNECT_STATUS, self.slot);
        let response = engine.transact(&command, self.timing.connect_sync_window, true);

        if response.contains(&success) {
            fl_info!(context = ctx, "connected to {}", self.broker.endpoint);
            return Ok(ConnectPath::Synchronous);
        }
        if response.contains(CONNECT_STATUS) {
            return Err(self.refused(&response));
        }
        if !is_ok(&response) {
            fl_error!(context = ctx.with_command(&command), "connect rejected: {}", response.trim());
            return Err(ConnectError::CommandRejected {
                response: response.trim().to_owned(),
            });
        }

        fl_info!(context = ctx, "connect accepted, awaiting broker result");
        let every = self.timing.connect_progress_every;
        let mut next_mark = every;
        let mut waited = Duration::ZERO;
        let outcome = engine.poll_for_observed(
            &response,
            &[success.as_str()],
            &[CONNECT_STATUS],
            self.timing.connect_async_budget,
            self.timing.connect_poll_slice,
            &mut |elapsed| {
                waited = elapsed;
                if !every.is_zero() && elapsed >= next_mark {
                    let line = format!("wait {}s", elapsed.as_secs());
                    fl_info!(context = ctx, "still waiting for broker ({}s)", elapsed.as_secs());
                    feedback.show(&["FieldLink", "6.Broker", line.as_str()]);
                    next_mark += every;
                }
            },
        );

        match outcome {
            PollOutcome::Matched(_) => {
                fl_info!(context = ctx, "connected to {} after {:?}", self.broker.endpoint, waited);
                Ok(ConnectPath::Asynchronous { waited })
            }
            PollOutcome::Rejected(text) => Err(self.refused(&text)),
            PollOutcome::TimedOut(_) => {
                fl_error!(context = ctx, "no connect result within {:?}", self.timing.connect_async_budget);
                Err(ConnectError::TimedOut { waited })
            }
        }
    }

    fn refused(&self, response: &str) -> ConnectError {
        let status = response
            .find(CONNECT_STATUS)
            .and_then(|start| response[start + CONNECT_STATUS.len()..].lines().next())
            .map(|line| line.trim().to_owned())
            .unwrap_or_default();
        fl_error!(context = LogContext::stage("connect"), "broker refused session: {}", status);
        ConnectError::Refused { status }
    }

    /// Declare and write the topic, declare and write the payload, then commit.
    ///
    /// The counter advances only when the commit is acknowledged. Returns the
    /// sequence number the message was sent under.
    pub fn publish(
        &mut self,
        engine: &mut Transactor,
        topic: &str,
        payload: &[u8],
        feedback: &Feedback,
    ) -> Result<u64, PublishError> {
        let ctx = LogContext::stage("publish");
        let slot = self.slot;

        let declared = engine.transact(
            &format!("AT+CMQTTTOPIC={},{}", slot, topic.len()),
            self.timing.publish_declare_wait,
            true,
        );
        if !declared.contains(PROMPT) {
            fl_warn!(context = ctx, "no prompt for topic: {}", declared.trim());
            return Err(PublishError::NoTopicPrompt);
        }
        self.write_section(engine, topic.as_bytes(), "topic")?;

        let declared = engine.transact(
            &format!("AT+CMQTTPAYLOAD={},{}", slot, payload.len()),
            self.timing.publish_declare_wait,
            true,
        );
        if !declared.contains(PROMPT) {
            fl_warn!(context = ctx, "no prompt for payload: {}", declared.trim());
            return Err(PublishError::NoPayloadPrompt);
        }
        self.write_section(engine, payload, "payload")?;

        let response = engine.transact(
            &format!(
                "AT+CMQTTPUB={},{},{}",
                slot, self.broker.qos, self.broker.publish_timeout_secs
            ),
            self.timing.publish_commit_wait,
            true,
        );
        if !is_ok(&response) {
            fl_warn!(context = ctx, "commit not acknowledged: {}", response.trim());
            return Err(PublishError::CommitRejected {
                response: response.trim().to_owned(),
            });
        }

        let sequence = self.counter;
        self.counter += 1;
        fl_info!(context = ctx, "message #{} published ({} bytes)", sequence, payload.len());
        feedback.blink(BlinkPattern::Ack, engine.clock().as_ref());
        Ok(sequence)
    }

    fn write_section(
        &self,
        engine: &mut Transactor,
        bytes: &[u8],
        phase: &'static str,
    ) -> Result<(), PublishError> {
        if !engine.write_raw(bytes) {
            return Err(PublishError::WriteFailed { phase });
        }
        engine.pause(self.timing.publish_echo_drain);
        engine.drain();
        Ok(())
    }

    /// Disconnect, release the handle, and stop the service.
    ///
    /// Each step runs regardless of the others and nothing is propagated.
    pub fn teardown(&mut self, engine: &mut Transactor) -> TeardownReport {
        let ctx = LogContext::stage("teardown");
        let disconnected = is_ok(&engine.transact(
            &format!(
                "AT+CMQTTDISC={},{}",
                self.slot, self.broker.disconnect_timeout_secs
            ),
            self.timing.teardown_disconnect_wait,
            true,
        ));
        let released = is_ok(&engine.transact(
            &format!("AT+CMQTTREL={}", self.slot),
            self.timing.teardown_release_wait,
            true,
        ));
        let stopped = stop_service(engine, self.timing.teardown_stop_wait);
        let report = TeardownReport {
            disconnected,
            released,
            stopped,
        };
        fl_debug!(context = ctx, "teardown finished: {:?}", report);
        report
    }
}
