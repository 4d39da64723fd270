//! Protocol payload types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a single diagnostic. Parsed case-insensitively, always
/// serialized lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Note,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Note => "note",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "note" => Ok(Severity::Note),
            "warning" => Ok(Severity::Warning),
            _ => Err(format!(
                "Invalid severity: '{}'. Expected: error, note, or warning",
                s
            )),
        }
    }
}

/// One structured finding extracted from the engine's textual report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
    /// Bracketed error code (e.g. `assignment`), empty when absent
    pub code: String,
}

// ============================================================================
// Requests
// ============================================================================

/// Payload of an `init` request. The whole payload is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    #[serde(default, alias = "mypyVersion", skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
}

/// A one-shot type check of in-memory source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Single relative path segment, e.g. `snippet.py`
    pub filename: String,
    pub code: String,
    /// Passed to the engine verbatim, after the staged path
    #[serde(default, alias = "mypyFlags")]
    pub engine_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

impl CheckRequest {
    pub fn new(filename: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            code: code.into(),
            engine_flags: Vec::new(),
            cache_dir: None,
        }
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<String>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }
}

// ============================================================================
// Events
// ============================================================================

/// Versions reported after a successful `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReport {
    /// Package host (uv) version
    pub host: String,
    /// Python interpreter version inside the managed runtime
    pub host_runtime: String,
    /// Installed engine version
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitDonePayload {
    pub versions: VersionReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Outcome of one check. `raw_text` is always stdout followed by stderr,
/// independent of how many diagnostics were recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub diagnostics: Vec<DiagnosticRecord>,
    pub raw_text: String,
    pub exit_status: i32,
    pub duration_ms: u64,
}
