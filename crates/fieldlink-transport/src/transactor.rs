//! ---
//! fl_section: "02-transaction-engine"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Command/response transaction engine."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::time::Duration;

use fieldlink_common::SharedClock;
use tracing::{debug, trace, warn};

use crate::channel::SerialChannel;

/// Terminator appended to every command line.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Byte-ready prompt emitted before the peripheral accepts raw bytes.
pub const PROMPT: &str = ">";

/// Result of polling the channel for one of several tokens.
///
/// Every variant carries the text accumulated while polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Matched(String),
    Rejected(String),
    TimedOut(String),
}

impl PollOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, PollOutcome::Matched(_))
    }

    pub fn text(&self) -> &str {
        match self {
            PollOutcome::Matched(text) | PollOutcome::Rejected(text) | PollOutcome::TimedOut(text) => {
                text
            }
        }
    }
}

/// Sole owner of the serial channel.
pub struct Transactor {
    channel: Box<dyn SerialChannel>,
    clock: SharedClock,
}

impl Transactor {
    pub fn new(channel: Box<dyn SerialChannel>, clock: SharedClock) -> Self {
        Self { channel, clock }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Block for `duration` on the engine clock.
    pub fn pause(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// Drain, send `command`, wait `wait`, and return whatever arrived.
    ///
    /// Returns empty text when nothing arrived or the channel failed. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn transact(&mut self, command: &str, wait: Duration, trace_command: bool) -> String {
        self.drain();
        if !self.send_line(command) {
            return String::new();
        }
        self.clock.sleep(wait);
        let response = self.read_available();
        if trace_command {
            debug!(command, response = %response.trim(), "transaction");
        } else {
            trace!(command, response = %response.trim(), "transaction");
        }
        response
    }

    /// Discard unsolicited input.
    pub fn drain(&mut self) {
        match self.channel.bytes_available() {
            Ok(0) => {}
            Ok(queued) => {
                trace!(queued, "discarding stale input");
                if let Err(err) = self.channel.discard_input() {
                    warn!(error = %err, "failed to discard serial input");
                }
            }
            Err(err) => warn!(error = %err, "failed to query serial input"),
        }
    }

    /// Write `command` followed by the line terminator.
    pub fn send_line(&mut self, command: &str) -> bool {
        let mut line = Vec::with_capacity(command.len() + LINE_TERMINATOR.len());
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(LINE_TERMINATOR);
        self.write_raw(&line)
    }

    /// Write bytes exactly as given, with no terminator.
    pub fn write_raw(&mut self, bytes: &[u8]) -> bool {
        match self.channel.write_all(bytes) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, len = bytes.len(), "serial write failed");
                false
            }
        }
    }

    /// Everything currently queued, decoded permissively.
    pub fn read_available(&mut self) -> String {
        match self.channel.read_available() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                warn!(error = %err, "serial read failed");
                String::new()
            }
        }
    }

    /// Poll in `slice` steps for at most `budget` until an accept or reject token shows up.
    ///
    /// Tokens are matched against the text accumulated since polling began, and accept
    /// tokens win when both are present.
    pub fn poll_for(
        &mut self,
        accept: &[&str],
        reject: &[&str],
        budget: Duration,
        slice: Duration,
    ) -> PollOutcome {
        self.poll_for_observed("", accept, reject, budget, slice, &mut |_| {})
    }

    /// Same as [`Transactor::poll_for`], starting from `seed` text already read and
    /// calling `observer` with the elapsed wait after each slice.
    pub fn poll_for_observed(
        &mut self,
        seed: &str,
        accept: &[&str],
        reject: &[&str],
        budget: Duration,
        slice: Duration,
        observer: &mut dyn FnMut(Duration),
    ) -> PollOutcome {
        let started = self.clock.now();
        let mut buffer = seed.to_owned();
        loop {
            buffer.push_str(&self.read_available());
            if accept.iter().any(|token| buffer.contains(token)) {
                return PollOutcome::Matched(buffer);
            }
            if reject.iter().any(|token| buffer.contains(token)) {
                return PollOutcome::Rejected(buffer);
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= budget {
                return PollOutcome::TimedOut(buffer);
            }
            let step = if slice.is_zero() { budget - elapsed } else { slice.min(budget - elapsed) };
            self.clock.sleep(step);
            observer(self.clock.now().saturating_duration_since(started));
        }
    }
}

impl std::fmt::Debug for Transactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transactor").finish_non_exhaustive()
    }
}
