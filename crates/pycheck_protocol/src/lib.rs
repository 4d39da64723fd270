//! Pycheck worker protocol
//!
//! Wire format between a caller and `pycheck-worker`: newline-delimited JSON
//! objects shaped `{ "type": ..., "payload": ... }`.
//!
//! ```text
//! -> {"type":"init","payload":{"engineVersion":"1.10.0"}}
//! <- {"type":"init-done","payload":{"versions":{"host":"0.4.18","hostRuntime":"3.12.1","engine":"1.10.0"}}}
//! -> {"type":"check","payload":{"filename":"a.py","code":"x: int = ''","engineFlags":[]}}
//! <- {"type":"checking"}
//! <- {"type":"result","payload":{"diagnostics":[...],"rawText":"...","exitStatus":1,"durationMs":412}}
//! ```
//!
//! The diagnostic parser lives here as well, since it only depends on the
//! data model.

pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod message;
pub mod paths;
pub mod types;

pub use diagnostics::parse_diagnostics;
pub use error::{ProtocolError, Result};
pub use message::{Event, Request};
pub use types::{
    CheckRequest, CheckResult, DiagnosticRecord, ErrorPayload, InitDonePayload, InitPayload,
    LogPayload, Severity, VersionReport,
};
