//! Diagnostic parser: engine report text -> structured records.
//!
//! Each line is matched independently against
//! `<file>:<line>:[<column>:] [<severity>:] <message> [[<code>]]`.
//! Lines that do not have the `file:line:` shape are skipped; parsing never
//! fails. Callers keep the raw text alongside, so nothing is lost when a line
//! is not recognised.

use regex::Regex;
use std::sync::LazyLock;

use crate::defaults::DEFAULT_SNIPPET_FILE;
use crate::types::{DiagnosticRecord, Severity};

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.*?):(\d+):(?:(\d+):)?\s*(?:((?i:error|note|warning)):)?\s*(.*?)(?:\s+\[([a-z0-9\-]+)\])?$",
    )
    .expect("diagnostic line pattern is valid")
});

/// Parse every recognisable diagnostic line in `text`, in order of appearance.
pub fn parse_diagnostics(text: &str) -> Vec<DiagnosticRecord> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse a single line. Returns `None` when the line is not a diagnostic.
pub fn parse_line(line: &str) -> Option<DiagnosticRecord> {
    let caps = DIAGNOSTIC_LINE.captures(line)?;

    let file = match caps.get(1).map(|m| m.as_str()) {
        Some(file) if !file.is_empty() => file.to_string(),
        _ => DEFAULT_SNIPPET_FILE.to_string(),
    };
    let line_no = positive_or_one(caps.get(2).map(|m| m.as_str()));
    let column = positive_or_one(caps.get(3).map(|m| m.as_str()));
    let severity = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<Severity>().ok())
        .unwrap_or_default();
    let message = caps.get(5).map(|m| m.as_str()).unwrap_or("").to_string();
    let code = caps.get(6).map(|m| m.as_str()).unwrap_or("").to_string();

    Some(DiagnosticRecord {
        file,
        line: line_no,
        column,
        severity,
        message,
        code,
    })
}

// Absent, overflowing or zero positions collapse to 1.
fn positive_or_one(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}
