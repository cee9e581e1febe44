//! ---
//! fl_section: "05-secure-session"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Session error types."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("publish service did not start: {response:?}")]
    ServiceStart { response: String },
    #[error("session handle {slot} not acquired: {response:?}")]
    AcquireRejected { slot: u8, response: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("TLS context assignment rejected: {response:?}")]
    ContextRejected { response: String },
    #[error("connect command rejected: {response:?}")]
    CommandRejected { response: String },
    #[error("broker refused the session with status {status}")]
    Refused { status: String },
    #[error("no connect result after {waited:?}")]
    TimedOut { waited: Duration },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("no prompt after declaring the topic")]
    NoTopicPrompt,
    #[error("no prompt after declaring the payload")]
    NoPayloadPrompt,
    #[error("{phase} write failed")]
    WriteFailed { phase: &'static str },
    #[error("publish commit not acknowledged: {response:?}")]
    CommitRejected { response: String },
}
