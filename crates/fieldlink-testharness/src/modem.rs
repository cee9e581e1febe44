//! ---
//! fl_section: "11-simulation"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Scripted modem peripheral implementing the serial channel."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fieldlink_common::SharedClock;
use fieldlink_transport::SerialChannel;
use parking_lot::Mutex;
use tracing::trace;

/// A scripted reaction to one command: text chunks released after delays.
///
/// A reply may open a raw window: the modem then swallows exactly as many bytes
/// as the command's last numeric argument announced before sending `after_raw`.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    chunks: Vec<(Duration, Vec<u8>)>,
    after_raw: Option<Box<Reply>>,
}

impl Reply {
    /// No output at all.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Text available immediately after the command is written.
    pub fn text(text: &str) -> Self {
        Self::silent().then_after(Duration::ZERO, text)
    }

    pub fn ok() -> Self {
        Self::text("\r\nOK\r\n")
    }

    pub fn error() -> Self {
        Self::text("\r\nERROR\r\n")
    }

    /// Byte-ready prompt followed by `after_raw` once the announced bytes arrive.
    pub fn prompt_then(after_raw: Reply) -> Self {
        Self {
            chunks: vec![(Duration::ZERO, b"\r\n>".to_vec())],
            after_raw: Some(Box::new(after_raw)),
        }
    }

    /// Add a chunk released `delay` after the triggering write.
    pub fn then_after(mut self, delay: Duration, text: &str) -> Self {
        self.chunks.push((delay, text.as_bytes().to_vec()));
        self
    }

    /// Shift every chunk of this reply `by` later.
    pub fn delayed(mut self, by: Duration) -> Self {
        for (delay, _) in &mut self.chunks {
            *delay += by;
        }
        self
    }

    /// Add raw bytes released `delay` after the triggering write.
    pub fn then_bytes_after(mut self, delay: Duration, bytes: &[u8]) -> Self {
        self.chunks.push((delay, bytes.to_vec()));
        self
    }
}

/// What the peripheral saw on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    Command(String),
    Raw(Vec<u8>),
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    replies: VecDeque<Reply>,
    last: Reply,
}

#[derive(Debug)]
struct RawWindow {
    remaining: usize,
    captured: Vec<u8>,
    reply: Reply,
}

#[derive(Debug)]
struct ModemState {
    rules: Vec<Rule>,
    fallback: Reply,
    pending: Vec<(Instant, Vec<u8>)>,
    queued: Vec<u8>,
    line: Vec<u8>,
    raw: Option<RawWindow>,
    transcript: Vec<TranscriptEntry>,
}

/// In-memory stand-in for the cellular modem.
///
/// Clones share the same state, so a test can keep one handle for scripting and
/// inspection while the engine owns another.
#[derive(Clone)]
pub struct SimulatedModem {
    state: Arc<Mutex<ModemState>>,
    clock: SharedClock,
}

impl SimulatedModem {
    /// Unknown commands are answered with `OK`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(ModemState {
                rules: Vec::new(),
                fallback: Reply::ok(),
                pending: Vec::new(),
                queued: Vec::new(),
                line: Vec::new(),
                raw: None,
                transcript: Vec::new(),
            })),
            clock,
        }
    }

    /// Answer every command matching `prefix` with `reply`.
    pub fn respond(&self, prefix: &str, reply: Reply) -> &Self {
        self.respond_seq(prefix, vec![reply])
    }

    /// Answer successive matching commands from `replies`; the last one repeats.
    pub fn respond_seq(&self, prefix: &str, replies: Vec<Reply>) -> &Self {
        let mut state = self.state.lock();
        let mut queue: VecDeque<Reply> = replies.into();
        let last = queue.back().cloned().unwrap_or_default();
        if queue.len() == 1 {
            queue.clear();
        }
        state.rules.retain(|rule| rule.prefix != prefix);
        state.rules.push(Rule {
            prefix: prefix.to_owned(),
            replies: queue,
            last,
        });
        self
    }

    /// Reply used for commands no rule matches.
    pub fn fallback(&self, reply: Reply) -> &Self {
        self.state.lock().fallback = reply;
        self
    }

    /// Queue unsolicited output `delay` from now.
    pub fn inject(&self, delay: Duration, text: &str) {
        let due = self.clock.now() + delay;
        self.state.lock().pending.push((due, text.as_bytes().to_vec()));
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.state.lock().transcript.clone()
    }

    /// Command lines received, without terminators.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .lock()
            .transcript
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Command(line) => Some(line.clone()),
                TranscriptEntry::Raw(_) => None,
            })
            .collect()
    }

    /// Raw payloads received inside prompt windows.
    pub fn raw_writes(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .transcript
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Raw(bytes) => Some(bytes.clone()),
                TranscriptEntry::Command(_) => None,
            })
            .collect()
    }

    /// Number of received commands starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    /// Bytes written while no prompt window was open and no line was completed.
    pub fn unterminated(&self) -> Vec<u8> {
        self.state.lock().line.clone()
    }
}

impl ModemState {
    fn release_due(&mut self, now: Instant) {
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].0 <= now {
                let (_, bytes) = self.pending.remove(index);
                self.queued.extend(bytes);
            } else {
                index += 1;
            }
        }
    }

    fn schedule(&mut self, now: Instant, reply: &Reply) {
        for (delay, bytes) in &reply.chunks {
            self.pending.push((now + *delay, bytes.clone()));
        }
        self.release_due(now);
    }

    fn reply_for(&mut self, command: &str) -> Reply {
        let best = self
            .rules
            .iter_mut()
            .filter(|rule| prefix_matches(&rule.prefix, command))
            .max_by_key(|rule| rule.prefix.len());
        match best {
            Some(rule) => rule.replies.pop_front().unwrap_or_else(|| rule.last.clone()),
            None => self.fallback.clone(),
        }
    }

    fn accept(&mut self, now: Instant, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            if let Some(window) = self.raw.as_mut() {
                let take = window.remaining.min(rest.len());
                window.captured.extend_from_slice(&rest[..take]);
                window.remaining -= take;
                rest = &rest[take..];
                if window.remaining == 0 {
                    if let Some(done) = self.raw.take() {
                        self.transcript.push(TranscriptEntry::Raw(done.captured));
                        self.schedule(now, &done.reply);
                    }
                }
                continue;
            }

            let byte = rest[0];
            rest = &rest[1..];
            self.line.push(byte);
            if self.line.ends_with(b"\r\n") {
                let raw_line = std::mem::take(&mut self.line);
                let command = String::from_utf8_lossy(&raw_line[..raw_line.len() - 2]).into_owned();
                trace!(command = %command, "simulated modem received command");
                self.transcript.push(TranscriptEntry::Command(command.clone()));
                let reply = self.reply_for(&command);
                if let Some(after) = &reply.after_raw {
                    self.raw = Some(RawWindow {
                        remaining: announced_length(&command),
                        captured: Vec::new(),
                        reply: (**after).clone(),
                    });
                }
                self.schedule(now, &reply);
            }
        }
    }
}

/// `prefix` matches when the command continues with a non-identifier character.
fn prefix_matches(prefix: &str, command: &str) -> bool {
    if !command.starts_with(prefix) {
        return false;
    }
    match command[prefix.len()..].chars().next() {
        None => true,
        Some(next) => !(next.is_ascii_alphanumeric() || next == '+' || next == '_'),
    }
}

/// Last comma-separated integer argument of the command.
fn announced_length(command: &str) -> usize {
    command
        .rsplit(',')
        .next()
        .and_then(|tail| tail.trim().parse().ok())
        .unwrap_or(0)
}

impl SerialChannel for SimulatedModem {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.release_due(now);
        Ok(state.queued.len())
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.release_due(now);
        Ok(std::mem::take(&mut state.queued))
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let now = self.clock.now();
        self.state.lock().accept(now, bytes);
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.release_due(now);
        state.queued.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeClock;
    use fieldlink_common::Clock;

    fn modem() -> (SimulatedModem, Arc<FakeClock>) {
        let clock = FakeClock::new();
        (SimulatedModem::new(clock.clone()), clock)
    }

    #[test]
    fn longest_matching_prefix_wins() {
        let (mut modem, _) = modem();
        modem.respond("AT", Reply::text("generic"));
        modem.respond("AT+CREG", Reply::text("+CREG: 0,1"));
        modem.write_all(b"AT+CREG?\r\n").unwrap();
        assert_eq!(modem.read_available().unwrap(), b"+CREG: 0,1");
        modem.write_all(b"AT\r\n").unwrap();
        assert_eq!(modem.read_available().unwrap(), b"generic");
    }

    #[test]
    fn sequences_repeat_their_last_reply() {
        let (mut modem, _) = modem();
        modem.respond_seq("AT+X", vec![Reply::text("a"), Reply::text("b")]);
        for expected in ["a", "b", "b"] {
            modem.write_all(b"AT+X\r\n").unwrap();
            assert_eq!(modem.read_available().unwrap(), expected.as_bytes());
        }
    }

    #[test]
    fn delayed_chunks_follow_the_clock() {
        let (mut modem, clock) = modem();
        modem.respond(
            "AT+SLOW",
            Reply::ok().then_after(Duration::from_secs(10), "+DONE"),
        );
        modem.write_all(b"AT+SLOW\r\n").unwrap();
        assert_eq!(modem.read_available().unwrap(), b"\r\nOK\r\n");
        assert!(modem.read_available().unwrap().is_empty());
        clock.sleep(Duration::from_secs(10));
        assert_eq!(modem.read_available().unwrap(), b"+DONE");
    }

    #[test]
    fn prompt_window_captures_announced_bytes() {
        let (mut modem, _) = modem();
        modem.respond("AT+CCERTDOWN", Reply::prompt_then(Reply::ok()));
        modem.write_all(b"AT+CCERTDOWN=\"ca.pem\",5\r\n").unwrap();
        assert_eq!(modem.read_available().unwrap(), b"\r\n>");
        modem.write_all(b"ab\r\ncAT\r\n").unwrap();
        assert_eq!(modem.raw_writes(), vec![b"ab\r\nc".to_vec()]);
        assert_eq!(modem.commands(), vec!["AT+CCERTDOWN=\"ca.pem\",5", "AT"]);
    }
}
