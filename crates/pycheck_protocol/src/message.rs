//! Request and event envelopes.
//!
//! Every message on the wire is a `{ "type": ..., "payload": ... }` object,
//! one per line. Requests are decoded exactly once, at the gateway boundary,
//! into the closed [`Request`] enum; the worker only ever emits [`Event`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::types::{
    CheckRequest, CheckResult, ErrorPayload, InitDonePayload, InitPayload, LogPayload,
    VersionReport,
};

/// Caller -> worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Request {
    /// Install (or replace) the engine and report versions.
    Init(InitPayload),
    /// Import the engine entry point ahead of the first check.
    Warmup,
    /// Run one type check.
    Check(CheckRequest),
}

/// Worker -> caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    InitDone(InitDonePayload),
    /// Informational text; also carries pass-through engine output.
    Log(LogPayload),
    /// Progress: the engine is about to run.
    Checking,
    Result(CheckResult),
    /// Terminal failure of the current request.
    Error(ErrorPayload),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl Request {
    /// Decode one wire message. A missing or `null` payload is accepted for
    /// `init` and `warmup`.
    pub fn decode(line: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(line)?;
        let kind = envelope.kind.ok_or(ProtocolError::MissingType)?;

        match kind.as_str() {
            "init" => {
                if envelope.payload.is_null() {
                    return Ok(Request::Init(InitPayload::default()));
                }
                serde_json::from_value(envelope.payload)
                    .map(Request::Init)
                    .map_err(|source| ProtocolError::InvalidPayload { kind: "init", source })
            }
            "warmup" => Ok(Request::Warmup),
            "check" => serde_json::from_value(envelope.payload)
                .map(Request::Check)
                .map_err(|source| ProtocolError::InvalidPayload { kind: "check", source }),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Init(_) => "init",
            Request::Warmup => "warmup",
            Request::Check(_) => "check",
        }
    }
}

impl Event {
    pub fn init_done(versions: VersionReport) -> Self {
        Event::InitDone(InitDonePayload { versions })
    }

    pub fn log(message: impl Into<String>) -> Self {
        Event::Log(LogPayload {
            message: message.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Whether this event ends the handling of a request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::InitDone(_) | Event::Result(_) | Event::Error(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::InitDone(_) => "init-done",
            Event::Log(_) => "log",
            Event::Checking => "checking",
            Event::Result(_) => "result",
            Event::Error(_) => "error",
        }
    }

    /// Encode as a single JSON line (no trailing newline).
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
